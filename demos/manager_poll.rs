use motelink::logging::setup_logging;
use motelink::{ManagerConfig, WiimoteManager};
use std::time::Duration;

fn main() -> motelink::Result<()> {
    setup_logging("info")?;

    let config = match std::env::args().nth(1) {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };
    let mut mgr = WiimoteManager::open_hidapi(config)?;

    if !mgr.find_wiimotes()? {
        println!("No Wii Remotes found. Press 1+2 on the remote and try again.");
        return Ok(());
    }
    println!("Devices:");
    for d in mgr.devices() {
        println!("- {d}");
    }

    let mut buf = [0u8; 22];
    while mgr.has_wiimote() {
        for d in mgr.devices() {
            match mgr.receive_raw(d.handle(), &mut buf) {
                Ok(0) => {}
                Ok(n) => println!("{}: {:02x?}", d.path(), &buf[..n]),
                Err(e) => eprintln!("{}: {e}", d.path()),
            }
        }
        // Sleep a touch to avoid pegging the CPU in the demo
        std::thread::sleep(Duration::from_millis(5));
    }

    mgr.shutdown()
}
