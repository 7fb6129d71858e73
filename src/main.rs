fn main() {
    std::process::exit(contract_registry::run());
}
