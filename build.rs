fn main() {
    println!("cargo:rerun-if-env-changed=MAILWATCH_CONFIG_JSON");
    println!("cargo:rerun-if-env-changed=MAILWATCH_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=MAILWATCH_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=MAILWATCH_MQTT_URL");
    println!("cargo:rerun-if-env-changed=MAILWATCH_MQTT_USER");
    println!("cargo:rerun-if-env-changed=MAILWATCH_MQTT_PASSWORD");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
