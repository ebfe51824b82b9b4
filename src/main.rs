fn main() -> anyhow::Result<()> {
    eyeread_lib::run()
}
