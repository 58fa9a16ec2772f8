use rocket::Route;

mod admin;
mod auth;
mod topics;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(topics::routes());
    routes.extend(voting::routes());
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes
}
