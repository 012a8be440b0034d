//! Prints an argon2 hash for seeding users by hand.

use std::env;

use anyhow::Context;
use volunteer_admin::auth::password::hash_password;

fn main() -> anyhow::Result<()> {
    let password = env::args()
        .nth(1)
        .context("usage: hash_password <password>")?;
    println!("{}", hash_password(&password)?);
    Ok(())
}
