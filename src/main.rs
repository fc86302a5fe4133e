fn main() -> anyhow::Result<()> {
    ambifocus_lib::run()
}
