pub mod time;

use nanoid::nanoid;

/// Generate a 21-character url-safe id for store rows.
pub fn longid() -> String {
    nanoid!()
}

/// Generate a short 8-character id for transient artifacts.
#[allow(unused)]
pub fn shortid() -> String {
    nanoid!(8)
}
