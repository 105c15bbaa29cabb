extern crate clap;
extern crate log;
extern crate rust_htslib;

fn main() {
    env_logger::init();
    std::process::exit(clipdel::wrapper() as i32);
}
