pub mod disk;
pub mod down;
pub mod firewall;
pub mod image;
pub mod instance;
pub mod up;
