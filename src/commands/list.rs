//! List commands implementation

use crate::registry;

/// List all drivers compiled into this build
pub fn list_drivers() {
    let drivers = registry::available_drivers();
    if drivers.is_empty() {
        println!("No drivers enabled in this build");
        return;
    }

    println!("Available drivers:");
    println!();
    for driver in drivers {
        println!("  {:<8} - {}", driver.name, driver.description);
    }
}
