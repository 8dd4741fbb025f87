//! Thin command-line harness for manual exploration of the engine.
//! Contains no logic beyond parsing a line into an `Engine` call and
//! printing the result.

use std::io::{self, BufRead, Write};

use small_record_db::{init_log, Engine};

fn main() {
    init_log();

    let path = match std::env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: small-record-db <data-file-path>");
            std::process::exit(1);
        }
    };

    let engine = match Engine::open(&path) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    };

    println!("small-record-db: {} ({} records on disk)", path, engine.get_record_count());
    println!("commands: insert <bytes> | read <id> | update <id> <bytes> | begin | commit | rollback | checkpoint | crash | recover | print-journal | quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "insert" => {
                let payload = parts.next().unwrap_or("").as_bytes();
                report(engine.insert_record(payload));
            }
            "read" => match parts.next().and_then(|s| s.parse::<i64>().ok()) {
                Some(id) => match engine.read_record(id) {
                    Ok(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
                    Err(e) => println!("error: {}", e),
                },
                None => println!("usage: read <id>"),
            },
            "update" => {
                let id = parts.next().and_then(|s| s.parse::<i64>().ok());
                let payload = parts.next().unwrap_or("").as_bytes();
                match id {
                    Some(id) => report(engine.update_record(id, payload)),
                    None => println!("usage: update <id> <bytes>"),
                }
            }
            "begin" => match engine.begin() {
                Ok(tx_id) => println!("started transaction {}", tx_id),
                Err(e) => println!("error: {}", e),
            },
            "commit" => report(engine.commit()),
            "rollback" => report(engine.rollback()),
            "checkpoint" => report(engine.checkpoint()),
            "crash" => {
                engine.crash();
                println!("simulated crash: in-memory state discarded");
            }
            "recover" => report(engine.recover()),
            "print-journal" => report(engine.print_journal()),
            "quit" | "exit" => break,
            other => println!("unknown command: {}", other),
        }
    }
}

fn report<T>(result: small_record_db::EngineResult<T>) {
    match result {
        Ok(_) => println!("ok"),
        Err(e) => println!("error: {}", e),
    }
}
