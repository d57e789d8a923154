use log::info;
use offroot::verify::USIGN_CANDIDATES;
use offroot_core::{util, PrivilegeMode, SystemCapabilities};
use std::path::Path;

pub fn check_requirements() {
    info!("Checking offline-root requirements");
    println!("Checking offline-root requirements...\n");

    let caps = SystemCapabilities::detect();
    println!("{}", caps.summary());

    if caps.can_enter_offline_root() {
        println!("\nOffline roots can be entered by this user");
    } else {
        println!("\nOffline roots need root or unprivileged user namespaces");
    }

    println!("\nPrivilege modes:");
    for mode in PrivilegeMode::all() {
        println!(
            "  {:12} - {}",
            format!("{:?}", mode).to_lowercase(),
            mode.description()
        );
    }

    println!("\nusign:");
    for candidate in USIGN_CANDIDATES {
        let present = Path::new(candidate).symlink_metadata().is_ok();
        println!("  {} {}", if present { "[ok]" } else { "[--]" }, candidate);
    }

    println!("\nSystem info:");
    println!("  UID: {}", util::get_uid());
    println!("  GID: {}", util::get_gid());
}
