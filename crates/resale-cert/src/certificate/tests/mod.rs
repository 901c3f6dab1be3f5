mod common;
mod filler;
