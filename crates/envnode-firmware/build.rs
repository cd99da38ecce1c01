/// Node settings that may be overridden from the environment or a `.env` file.
const FORWARDED: [&str; 3] = ["ENVNODE_WARM_UP_SECS", "ENVNODE_CYCLE_MS", "ENVNODE_POWER"];

fn main() {
    linker_message();

    println!("cargo:rerun-if-changed=.env");
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            println!("cargo:warning=could not read .env: {e}");
        }
    }

    for key in FORWARDED {
        println!("cargo:rerun-if-env-changed={key}");
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch.starts_with("xtensa") {
        let exe_path = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("cargo:rustc-link-arg=-Wl,--error-handling-script={exe_path}");
    }
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

/// Invoked by the linker through `--error-handling-script` with the failure
/// kind and the missing symbol.
fn linker_message() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return;
    }

    if args[1] == "undefined-symbol" {
        match args[2].as_str() {
            "_stack_start" => {
                eprintln!();
                eprintln!("Is the linker script `linkall.x` missing?");
                eprintln!();
            }
            "esp_rtos_initialized" | "esp_rtos_yield_task" => {
                eprintln!();
                eprintln!("`esp-rtos` was not started; call `esp_rtos::start` before spawning tasks");
                eprintln!();
            }
            _ => (),
        }
        std::process::exit(0);
    }

    std::process::exit(1);
}
