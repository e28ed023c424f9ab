pub mod firds;
