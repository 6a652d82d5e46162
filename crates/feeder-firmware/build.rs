use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=.env");
    dotenv_build::output(dotenv_build::Config::default())?;

    let build_date = chrono::Utc::now().format("%Y%m%d");
    println!(
        "cargo:rustc-env=BUILD_VERSION={}-{}",
        env!("CARGO_PKG_VERSION"),
        build_date
    );
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    Ok(())
}
