fn main() -> anyhow::Result<()> {
    gitstery::run()?;
    Ok(())
}
