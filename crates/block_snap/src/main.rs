fn main() {
    block_snap::run();
}
