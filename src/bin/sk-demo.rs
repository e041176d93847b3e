// Demonstration driver for the Suzuki-Kasami core: canned scenarios plus an
// interactive command loop. All protocol behavior lives in the library; this
// binary only calls public operations and renders the results.

use sk_core::config::ClusterConfig;
use sk_core::coordinator::{Coordinator, ExitCsOutcome, InvalidNodeId, RequestCsOutcome};
use sk_core::types::{CsAction, MessageRecord};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};

fn main() {
    let mut config_path: Option<String> = None;
    let mut nodes_override: Option<usize> = None;
    let mut holder_override: Option<usize> = None;
    let mut scenario: Option<u32> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--nodes" => nodes_override = args.next().and_then(|v| v.parse().ok()),
            "--holder" => holder_override = args.next().and_then(|v| v.parse().ok()),
            "--scenario" => scenario = args.next().and_then(|v| v.parse().ok()),
            _ => {
                eprintln!("unknown arg {}", arg);
                return;
            }
        }
    }

    if let Some(n) = scenario {
        run_scenario(n);
        return;
    }

    let config = match config_path {
        Some(ref path) => {
            let raw = fs::read_to_string(path).expect("read config file");
            serde_json::from_str::<ClusterConfig>(&raw).expect("parse config json")
        }
        None => ClusterConfig::new(nodes_override.unwrap_or(3), holder_override.unwrap_or(0)),
    };

    if nodes_override.is_some() || holder_override.is_some() || config_path.is_some() {
        interactive(config);
        return;
    }

    menu();
}

fn menu() {
    banner("SUZUKI-KASAMI BROADCAST ALGORITHM");
    println!("Distributed mutual exclusion demonstration");

    loop {
        println!();
        println!("Select a scenario:");
        println!("  1. Basic operation");
        println!("  2. Multiple concurrent requests");
        println!("  3. Token passing chain");
        println!("  4. Interactive mode");
        println!("  5. Exit");

        let choice = match prompt("Enter choice (1-5): ") {
            Some(line) => line,
            None => return,
        };

        match choice.as_str() {
            "1" => run_scenario(1),
            "2" => run_scenario(2),
            "3" => run_scenario(3),
            "4" => interactive(prompt_config()),
            "5" => {
                println!("Bye.");
                return;
            }
            _ => println!("Invalid choice. Please select 1-5."),
        }
    }
}

fn prompt_config() -> ClusterConfig {
    let num_nodes = prompt("Number of nodes (2-10): ")
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| (2..=10).contains(n))
        .unwrap_or_else(|| {
            println!("Invalid node count, using 3.");
            3
        });
    let initial_holder = prompt(&format!("Initial token holder (0-{}): ", num_nodes - 1))
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|h| *h < num_nodes)
        .unwrap_or_else(|| {
            println!("Invalid holder id, using 0.");
            0
        });
    ClusterConfig::new(num_nodes, initial_holder)
}

fn run_scenario(n: u32) {
    match n {
        1 => scenario_basic_operation(),
        2 => scenario_concurrent_requests(),
        3 => scenario_token_chain(),
        _ => eprintln!("unknown scenario {} (expected 1-3)", n),
    }
}

/// Three nodes, node 0 holds the token: enter, exit, then node 1 takes over.
fn scenario_basic_operation() {
    banner("SCENARIO 1: Basic operation");
    println!("3 nodes, node 0 has the initial token");

    let mut sk = Coordinator::new(ClusterConfig::new(3, 0)).expect("valid cluster config");
    print_state(&sk);

    println!("\n>>> node 0 enters the critical section");
    report_enter(sk.enter_cs(0), 0);
    print_state(&sk);

    println!("\n>>> node 0 exits the critical section");
    report_exit(sk.exit_cs(0), 0);

    println!("\n>>> node 1 requests the critical section");
    report_request(sk.request_cs(1), 1);

    println!("\n>>> node 1 enters the critical section");
    report_enter(sk.enter_cs(1), 1);

    print_state(&sk);
    print_message_log(&sk, 10);
}

/// Five nodes; 1, 2 and 3 request while node 0 sits in the critical section.
fn scenario_concurrent_requests() {
    banner("SCENARIO 2: Multiple concurrent requests");
    println!("5 nodes, node 0 has the initial token and is in the CS");

    let mut sk = Coordinator::new(ClusterConfig::new(5, 0)).expect("valid cluster config");
    report_enter(sk.enter_cs(0), 0);

    println!("\n>>> nodes 1, 2, 3 request the critical section");
    for id in [1, 2, 3] {
        report_request(sk.request_cs(id), id);
    }
    print_state(&sk);

    println!("\n>>> node 0 exits; the token goes to the queue front");
    report_exit(sk.exit_cs(0), 0);

    print_state(&sk);
    print_message_log(&sk, 10);
}

/// Four nodes take the critical section in sequence.
fn scenario_token_chain() {
    banner("SCENARIO 3: Token passing chain");
    println!("4 nodes, sequential access");

    let mut sk = Coordinator::new(ClusterConfig::new(4, 0)).expect("valid cluster config");

    for id in 0..sk.num_nodes() {
        println!("\n>>> node {} sequence:", id);
        if id > 0 {
            report_request(sk.request_cs(id), id);
        }
        report_enter(sk.enter_cs(id), id);
        report_exit(sk.exit_cs(id), id);
    }

    print_state(&sk);
    print_cs_log(&sk);
    print_message_log(&sk, 10);
}

fn interactive(config: ClusterConfig) {
    banner("INTERACTIVE MODE");

    let mut sk = match Coordinator::new(config) {
        Ok(sk) => sk,
        Err(e) => {
            eprintln!("invalid cluster config: {:?}", e);
            return;
        }
    };
    println!(
        "{} nodes, node {} has the initial token",
        config.num_nodes, config.initial_holder
    );
    print_state(&sk);

    println!();
    println!("Commands:");
    println!("  r <id>  request the critical section");
    println!("  e <id>  enter the critical section");
    println!("  x <id>  exit the critical section");
    println!("  s       show system state");
    println!("  m       show message log");
    println!("  l       show CS access log");
    println!("  j       dump system state as JSON");
    println!("  q       quit");

    loop {
        let line = match prompt("> ") {
            Some(line) => line,
            None => return,
        };
        let mut parts = line.split_whitespace();
        let cmd = match parts.next() {
            Some(cmd) => cmd,
            None => continue,
        };

        match cmd {
            "q" => return,
            "s" => print_state(&sk),
            "m" => print_message_log(&sk, 20),
            "l" => print_cs_log(&sk),
            "j" => {
                let state = sk.get_system_state();
                match serde_json::to_string_pretty(&state) {
                    Ok(json) => println!("{}", json),
                    Err(e) => eprintln!("state serialization failed: {}", e),
                }
            }
            "r" | "e" | "x" => {
                let id = match parts.next().and_then(|v| v.parse::<usize>().ok()) {
                    Some(id) => id,
                    None => {
                        println!("Please specify a node id.");
                        continue;
                    }
                };
                match cmd {
                    "r" => report_request(sk.request_cs(id), id),
                    "e" => report_enter(sk.enter_cs(id), id),
                    _ => report_exit(sk.exit_cs(id), id),
                }
            }
            _ => println!("Unknown command."),
        }
    }
}

fn report_request(result: Result<RequestCsOutcome, InvalidNodeId>, id: usize) {
    match result {
        Ok(outcome) => {
            println!(
                "node {} broadcast a request (seq={})",
                id, outcome.sequence
            );
            if let Some(from) = outcome.granted_from {
                println!("node {} received the token from node {}", id, from);
            } else if outcome.has_token_now {
                println!("node {} already holds the token", id);
            }
        }
        Err(e) => println!("rejected: node id {} is out of range (0-{})", e.id, e.num_nodes - 1),
    }
}

fn report_enter(result: Result<bool, InvalidNodeId>, id: usize) {
    match result {
        Ok(true) => println!("node {} entered the critical section", id),
        Ok(false) => println!(
            "node {} cannot enter (no token or already in the CS)",
            id
        ),
        Err(e) => println!("rejected: node id {} is out of range (0-{})", e.id, e.num_nodes - 1),
    }
}

fn report_exit(result: Result<ExitCsOutcome, InvalidNodeId>, id: usize) {
    match result {
        Ok(outcome) if outcome.exited => {
            println!("node {} exited the critical section", id);
            if let Some(to) = outcome.token_sent_to {
                println!("token sent to node {}", to);
            }
        }
        Ok(_) => println!("node {} is not in the critical section", id),
        Err(e) => println!("rejected: node id {} is out of range (0-{})", e.id, e.num_nodes - 1),
    }
}

fn print_state(sk: &Coordinator) {
    let state = sk.get_system_state();
    println!();
    separator('=');
    println!("SYSTEM STATE");
    separator('=');
    println!("Nodes: {}", state.num_nodes);
    println!("Messages sent: {}", state.total_messages);
    println!("CS accesses: {}", state.cs_accesses);
    separator('-');
    for node in &state.nodes {
        let token = if node.has_token { "HAS TOKEN" } else { "        " };
        let cs = if node.in_critical_section { "IN CS" } else { "     " };
        let queue = match &node.token_queue {
            Some(queue) => format!(" queue={:?}", queue),
            None => String::new(),
        };
        println!(
            "  node {}: {} | {} | seq={}{}",
            node.node_id, token, cs, node.own_sequence, queue
        );
    }
    separator('-');
}

fn print_message_log(sk: &Coordinator, last_n: usize) {
    let log = sk.get_message_log();
    if log.is_empty() {
        println!("\nNo messages exchanged yet.");
        return;
    }
    println!("\nMessage log (last {}):", last_n);
    separator('-');
    let skip = log.len().saturating_sub(last_n);
    for record in &log[skip..] {
        match record {
            MessageRecord::Request { from, sequence, .. } => {
                println!("  [REQUEST] node {} broadcast (seq={})", from, sequence)
            }
            MessageRecord::Token { from, to, .. } => {
                println!("  [TOKEN]   node {} -> node {}", from, to)
            }
        }
    }
    separator('-');
}

fn print_cs_log(sk: &Coordinator) {
    let log = sk.get_cs_access_log();
    if log.is_empty() {
        println!("\nNo critical section accesses yet.");
        return;
    }
    println!("\nCritical section access log:");
    separator('-');
    for record in log {
        let action = match record.action {
            CsAction::Enter => "ENTER",
            CsAction::Exit => "EXIT",
        };
        println!("  node {}: {}", record.node_id, action);
    }
    separator('-');
}

fn banner(title: &str) {
    println!();
    separator('=');
    println!("{}", title);
    separator('=');
}

fn separator(ch: char) {
    println!("{}", ch.to_string().repeat(60));
}

fn prompt(text: &str) -> Option<String> {
    print!("{}", text);
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}
