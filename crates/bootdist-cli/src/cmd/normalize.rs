//! Normalize command

use bootdist_schema::normalise_option_name;

/// Print the freezer spelling of each option name.
pub fn normalize(names: &[String]) {
    for name in names {
        println!("{name} -> {}", normalise_option_name(name));
    }
}
