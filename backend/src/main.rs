use covers_backend::config;

#[rocket::launch]
fn rocket() -> _ {
    config::load_environment();
    config::init_logger();
    covers_backend::build_rocket()
}
