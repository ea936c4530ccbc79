use anyhow::Result;

fn main() -> Result<()> {
    funding_cli::main_entry()
}
