//! # zcode
//!
//! A virtual machine for Z-code story files, versions 3 to 8.
//!
//! Run a story with `zcode story.z5`. See the
//! [introduction](_Introduction/index.html) for commands and options.
//!
//! The machine itself is independent of any terminal. Implement
//! [`mach::Host`] to give it a screen, a keyboard and files, then
//! drive it with [`mach::Runtime::execute`].
//! ```ignore
//! let mut runtime = Runtime::new(image, Options::default(), &host)?;
//! while runtime.execute(&mut host, 5000) == Event::Running {}
//! ```

#[path = "doc/introduction.rs"]
#[allow(non_snake_case)]
pub mod _Introduction;

pub mod lang;
pub mod mach;
pub mod term;
