fn main() {
    // Only the espidf build needs the ESP-IDF environment exported to rustc.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
