fn main() {
    clinicalsetu_lib::run()
}
