// Generates the pipeplan man page into target/man/

use clap::CommandFactory;
use clap_mangen::Man;
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    let out_dir = PathBuf::from("target").join("man");
    std::fs::create_dir_all(&out_dir)?;

    let cmd = pipeplan::cli::Cli::command();
    let man = Man::new(cmd);
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer)?;

    let out_path = out_dir.join("pipeplan.1");
    std::fs::write(&out_path, buffer)?;
    println!("Wrote {}", out_path.display());
    Ok(())
}
