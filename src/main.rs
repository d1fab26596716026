use kairos::{BusBuilder, DispatchPolicy, LogicalTime, Payload};

fn main() {
    println!("═══════════════════════════════════════════════════════");
    println!("  Kairos — Deterministic Topic Event Scheduler");
    println!("  Delayed delivery + replay verification demo");
    println!("═══════════════════════════════════════════════════════");
    println!();

    // ── Run 1: original run with dispatch logging ─────────────
    let hash_1 = run_bus("Run 1");

    // ── Run 2: identical replay ───────────────────────────────
    let hash_2 = run_bus("Run 2");

    // ── Verify ────────────────────────────────────────────────
    println!("  Verification:");
    println!("    Run 1 log hash: {:016x}", hash_1);
    println!("    Run 2 log hash: {:016x}", hash_2);
    if hash_1 == hash_2 {
        println!("    ✓ Logs are IDENTICAL — deterministic dispatch confirmed.");
    } else {
        println!("    ✗ MISMATCH — determinism violation detected!");
    }
    println!();
    println!("  ✓ Demo complete.");
}

fn run_bus(label: &str) -> u64 {
    let mut bus = BusBuilder::new()
        .policy(DispatchPolicy::CollectErrors)
        .with_logging()
        .handler("orders", |args| {
            println!("      [orders] {}", render(args));
            Ok(())
        })
        .handler("orders", |args| {
            // Second subscriber on the same topic; fires after the first.
            println!("      [audit ] {}", render(args));
            Ok(())
        })
        .handler("alerts", |args| {
            println!("      [alerts] {}", render(args));
            Ok(())
        })
        .build()
        .expect("builder seeds only registered topics");

    println!("  {}:", label);

    // Publish out of order; delivery is strictly time-ordered.
    bus.publish("orders", LogicalTime::new(10), vec![Payload::int(1)])
        .expect("orders is registered");
    bus.publish("orders", LogicalTime::new(5), vec![Payload::int(2)])
        .expect("orders is registered");
    bus.publish("alerts", LogicalTime::new(5), vec![Payload::text("disk space low")])
        .expect("alerts is registered");
    bus.publish("alerts", LogicalTime::new(20), vec![Payload::text("cleared")])
        .expect("alerts is registered");

    // Drain the first half of the timeline, then the rest.
    let mid = bus.run_until(LogicalTime::new(10)).expect("collect-errors drain");
    let end = bus.run_until(LogicalTime::new(20)).expect("collect-errors drain");

    let log = bus.log().expect("logging enabled");
    println!(
        "    {} + {} events dispatched, {} logged, now at {}",
        mid.dispatched,
        end.dispatched,
        log.len(),
        bus.current_time(),
    );

    log.log_hash()
}

fn render(args: &[Payload]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
