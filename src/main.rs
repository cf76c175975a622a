fn main() -> anyhow::Result<()> {
    grfkit::run()
}
