// src/console.rs
//
// Command-line control surface for a running session.
//
// Single-character commands, one per line: p pause, s save, r resume,
// q stop-and-exit. Unrecognized input is ignored. Controller errors are
// printed and the console keeps accepting commands; they never crash the
// controller.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::manager::AgentManager;

/// Drive the manager from stdin until `q` or end-of-input.
pub async fn run_console(manager: &mut AgentManager) -> std::io::Result<()> {
    println!(" {} agents learning", manager.worker_count());
    println!("--------------------------------------");
    println!("Do things by typing a command and pressing enter.");
    println!("Unrecognized commands will be ignored.");
    println!("p: pause; s: save Qtable; r: resume; q: stop");
    println!("---------------------------------------------");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = line.trim().chars().next() else {
            continue;
        };
        match command {
            'p' => {
                manager.pause();
                println!("Paused");
            }
            's' => match manager.save().await {
                Ok(()) => println!("Saved\nPaused"),
                Err(err) => println!("Save failed: {}", err),
            },
            'r' => {
                manager.resume();
                println!("Resumed");
            }
            'q' => {
                manager.stop().await;
                println!("Stopped");
                break;
            }
            _ => {} // ignored
        }
    }
    Ok(())
}
