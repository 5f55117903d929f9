pub mod vof;
