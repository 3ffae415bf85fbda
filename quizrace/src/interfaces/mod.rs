pub mod hud_interface;
