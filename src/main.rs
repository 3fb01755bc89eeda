fn main() -> anyhow::Result<()> {
    hoh_scan_lib::run()
}
