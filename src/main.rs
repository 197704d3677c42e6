//! cx-emu: emulator core demo for the RISC-V CX indirect CSR window

use std::env;
use std::sync::Arc;

use cx_emu::config::Config;
use cx_emu::cx::{
    AccessError, CxEngine, CxWindow, ExtensionRegistry, LogTracer, MulAccExt, ScratchExt,
};
use cx_emu::cx::ext::mulacc;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut dump_state = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--sample-config" => {
                print!("{}", Config::sample_config());
                if let Some(path) = Config::user_config_path() {
                    eprintln!();
                    eprintln!("# Write this to {} or ./cx-emu.toml", path.display());
                }
                return Ok(());
            }
            "--dump-state" | "-d" => dump_state = true,
            other => {
                eprintln!("Usage: cx-emu [--sample-config] [--dump-state]");
                anyhow::bail!("unknown argument: {}", other);
            }
        }
    }

    // Bring-up: build the registry before any hart touches the window.
    let config = Config::load();
    let mut registry = config.build_registry()?;
    if registry.is_empty() {
        log::info!("No extensions configured, installing demo roster");
        registry = demo_roster()?;
    }
    let registry = Arc::new(registry);

    let engine = CxEngine::with_tracer(registry.clone(), Arc::new(LogTracer));
    let mut windows: Vec<CxWindow> = (0..config.harts() as u64).map(CxWindow::new).collect();

    println!("cx-emu: {} hart(s), {} extension(s)", windows.len(), registry.len());
    println!();

    run_demo(&engine, &mut windows[0]);

    if dump_state {
        println!();
        println!("Final state");
        println!("===========");
        registry.print_summary();
        for win in &windows {
            println!(
                "  hart {}: cxsel={:#x} cxsetsel={:#x} cxidx={:#x}",
                win.hart(),
                win.selector(),
                win.set_selector(),
                win.index()
            );
        }
    }

    Ok(())
}

/// Built-in roster used when no config file provides one.
fn demo_roster() -> anyhow::Result<ExtensionRegistry> {
    let mut registry = ExtensionRegistry::new();
    registry.register(5, Arc::new(ScratchExt::new(1, 16)))?;
    registry.register(6, Arc::new(MulAccExt::new()))?;
    Ok(registry)
}

/// Scripted walk through the window protocol on one hart.
fn run_demo(engine: &CxEngine, win: &mut CxWindow) {
    // Round trip through whichever scratch extension is installed.
    let roster = engine.registry().roster();
    if let Some((sel, _)) = roster.iter().find(|(_, name)| *name == "scratch") {
        println!("scratch @ selector {}: write 0x42 to set 0, index 3", sel);
        engine.write_selector(win, *sel);
        engine.write_set_selector(win, 0);
        engine.write_index(win, 3);
        match engine.write_data(win, 0x42) {
            Ok(()) => match engine.read_data(win) {
                Ok(v) => println!("  read back: {:#x}", v),
                Err(e) => println!("  read failed: {}", e),
            },
            Err(e) => println!("  write failed: {}", e),
        }
    }

    // Drive the MAC unit if present.
    if let Some((sel, _)) = roster.iter().find(|(_, name)| *name == "mulacc") {
        println!("mulacc @ selector {}: 6 * 7 accumulated", sel);
        engine.write_selector(win, *sel);
        engine.write_set_selector(win, 0);
        let program: [(u64, u64); 3] = [
            (mulacc::REG_OP_A, 6),
            (mulacc::REG_OP_B, 7),
            (mulacc::REG_CTRL, mulacc::CTRL_MAC),
        ];
        for (reg, value) in program {
            engine.write_index(win, reg);
            if let Err(e) = engine.write_data(win, value) {
                println!("  write failed: {}", e);
                return;
            }
        }
        engine.write_index(win, mulacc::REG_ACC_LO);
        match engine.read_data(win) {
            Ok(v) => println!("  accumulator: {}", v),
            Err(e) => println!("  read failed: {}", e),
        }
    }

    // Error paths: both surface to the caller and trace once.
    engine.write_selector(win, 0);
    match engine.read_data(win) {
        Err(AccessError::NoExtensionSelected) => {
            println!("cxsel=0: read correctly refused (no extension selected)")
        }
        other => println!("cxsel=0: unexpected outcome {:?}", other),
    }

    let unknown = roster.iter().map(|(sel, _)| *sel).max().unwrap_or(0) + 3;
    engine.write_selector(win, unknown);
    match engine.write_data(win, 1) {
        Err(AccessError::UnknownExtension(sel)) => {
            println!("cxsel={}: write correctly refused (unknown extension)", sel)
        }
        other => println!("cxsel={}: unexpected outcome {:?}", unknown, other),
    }
}
