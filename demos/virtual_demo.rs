use motelink::backends::virtual_hid::VirtualTransport;
use motelink::logging::setup_logging;
use motelink::{DeviceDescriptor, ManagerConfig, WiimoteManager};
use std::time::Duration;

fn main() -> motelink::Result<()> {
    setup_logging("motelink=debug")?;

    // A virtual bus with one Remote Plus and one Pro Controller plugged in
    let bus = VirtualTransport::new();
    bus.attach(
        DeviceDescriptor::new(0x057e, 0x0330, "virtual:plus")
            .with_product_string("Nintendo RVL-CNT-01-TR"),
    );
    bus.attach(
        DeviceDescriptor::new(0x057e, 0x0330, "virtual:pro")
            .with_product_string("Nintendo RVL-CNT-01-UC"),
    );

    let config = ManagerConfig {
        debug_messages: true,
        ..ManagerConfig::default()
    };
    let mut mgr = WiimoteManager::with_config(bus.clone(), config);
    println!("Found: {}", mgr.find_wiimotes()?);
    for dev in mgr.devices() {
        println!("- {dev}");
    }

    // Feed a buttons report (A held) and poll it back
    bus.push_input("virtual:plus", &[0x30, 0x00, 0x08]);
    let mut buf = [0u8; 22];
    let plus = mgr.device("virtual:plus").map(|d| d.handle().clone());
    if let Some(handle) = plus {
        let n = mgr.receive_raw(&handle, &mut buf)?;
        println!("(Virtual) read {n} byte(s): {:02x?}", &buf[..n]);

        // Player 1 LED
        mgr.send_raw(&handle, &[0x11, 0x10])?;
    }

    std::thread::sleep(Duration::from_millis(150));
    for w in bus.writes() {
        println!("(Virtual) wrote {:02x?} to {}", w.data, w.path);
    }

    mgr.shutdown()
}
