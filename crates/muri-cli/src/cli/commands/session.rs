//! Session flag command handlers.

use anyhow::Result;
use muri_core::session;

pub fn login() -> Result<()> {
    let path = session::login()?;
    println!("Signed in (marker at {})", path.display());
    Ok(())
}

pub fn logout() -> Result<()> {
    session::logout()?;
    println!("Signed out.");
    Ok(())
}

pub fn status() {
    if session::is_authenticated() {
        println!("Signed in.");
    } else {
        println!("Signed out.");
    }
}
