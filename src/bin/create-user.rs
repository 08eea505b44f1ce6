use std::error::Error;

use dotenv::dotenv;
use log::{info, initialize_logger};
use structopt::StructOpt;

use songs::config::get_variable;
use songs::db::{Db, PgDb};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "create-user",
    about = "Register an account and print its API token"
)]
struct Opt {
    /// The username to register
    username: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::PgPool::connect(&connection_string).await?;
    let db = PgDb::new(pool);

    let username = opt.username.trim();
    info!(logger, "Creating user..."; "username" => username);

    let (user, token) = db.create_user(username).await?;
    info!(logger, "Created user"; "id" => user.id, "username" => &user.username);

    println!("{}", token);

    Ok(())
}
