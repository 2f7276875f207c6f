//! Grants the admin role to an existing user, straight against the store.
//!
//! There is no hardcoded admin account: the first admin is created with
//! this tool, and further admins are promoted through the API.
//!
//! Usage: `ensure_admin <username>` (reads `DATA_DIR` like the server).

use flashflashy::{Config, Store};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let username = match std::env::args().nth(1) {
        Some(name) => name.trim().to_lowercase(),
        None => {
            eprintln!("Usage: ensure_admin <username>");
            std::process::exit(2);
        }
    };

    let config = Config::load();
    let store = Store::open(&config.data_dir)?;

    let mut user = match store.find_user_by_username(&username) {
        Some(user) => user,
        None => {
            eprintln!("User {username:?} not found in {}", config.data_dir.display());
            std::process::exit(1);
        }
    };

    if user.is_admin {
        println!("User {} already has admin status.", user.username);
        return Ok(());
    }

    user.is_admin = true;
    store.put_user(user.clone())?;

    println!("Admin status granted:");
    println!("  id:       {}", user.id);
    println!("  username: {}", user.username);
    println!("  email:    {}", user.email);

    Ok(())
}
