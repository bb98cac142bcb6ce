fn main() -> anyhow::Result<()> {
    lbcfd_cmd::cmd::run()?;
    Ok(())
}
