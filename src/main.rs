//! # zcode
//!
//! Play a Z-code story in the terminal.
//!

fn main() {
    zcode::term::main()
}
