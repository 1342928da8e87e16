//! Property test modules

mod diff_laws;
