use anyhow::Result;
use console::style;
use cpal::traits::{DeviceTrait, HostTrait};

/// Print the available input devices, marking the default and the one the
/// config file selects.
pub fn list_devices(configured: &str) -> Result<()> {
    let host = cpal::default_host();

    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let names: Vec<String> = host
        .input_devices()?
        .map(|d| d.name().unwrap_or_else(|_| "<unknown>".into()))
        .collect();

    if names.is_empty() {
        eprintln!("No audio input devices found.");
        return Ok(());
    }

    println!("{}", style("Audio Input Devices").bold());
    println!();

    for name in &names {
        let marker = device_marker(name, &default_name, configured);
        if marker.is_empty() {
            println!("    {}", style(name).bold());
        } else {
            println!("  {} {}", style(marker).green().bold(), style(name).green().bold());
        }
    }

    println!();
    println!("  {} = default device", style("*").green().bold());
    if configured != "default" && !names.iter().any(|n| n == configured) {
        println!(
            "  {} configured device {:?} is not connected",
            style("WARNING").red().bold(),
            configured
        );
    } else {
        println!("  {} = selected in config", style(">").green().bold());
    }

    Ok(())
}

fn device_marker(name: &str, default_name: &str, configured: &str) -> &'static str {
    let is_default = name == default_name;
    let is_selected = if configured == "default" {
        is_default
    } else {
        name == configured
    };
    match (is_selected, is_default) {
        (true, _) => ">",
        (false, true) => "*",
        (false, false) => "",
    }
}
