//! Scripted client: creates a room, seats two local players and plays random
//! moves until the game ends, mirroring the board with the shared engine.

use clap::Parser;
use connect4_shared::protocol::{decode, read_frame, write_frame};
use connect4_shared::{ClientEvent, Color, Game, NewPlayer, ServerEvent};
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:3000")]
    server: String,
}

async fn send(stream: &mut TcpStream, event: ClientEvent) -> Result<(), Box<dyn std::error::Error>> {
    println!("-> {}", event.name());
    write_frame(stream, &event).await?;
    Ok(())
}

async fn recv(stream: &mut TcpStream) -> Result<ServerEvent, Box<dyn std::error::Error>> {
    let bytes = timeout(Duration::from_secs(5), read_frame(stream))
        .await??
        .ok_or("server closed the connection")?;
    let event: ServerEvent = decode(&bytes)?;
    println!("<- {}", event.name());
    Ok(event)
}

/// Reads events until `pick` accepts one
async fn wait_for<T>(
    stream: &mut TcpStream,
    mut pick: impl FnMut(ServerEvent) -> Option<T>,
) -> Result<T, Box<dyn std::error::Error>> {
    loop {
        if let Some(value) = pick(recv(stream).await?) {
            return Ok(value);
        }
    }
}

fn print_board(game: &Game) {
    for row in game.slots() {
        let line: String = row
            .iter()
            .map(|slot| match slot.color {
                Some(_) if slot.is_winning => '*',
                Some(Color::Red) => 'R',
                Some(Color::Yellow) => 'Y',
                Some(_) => '?',
                None => '.',
            })
            .collect();
        println!("  {}", line);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);

    send(&mut stream, ClientEvent::RoomCreate).await?;
    let code = wait_for(&mut stream, |event| match event {
        ServerEvent::RoomCreated { code } => Some(code),
        _ => None,
    })
    .await?;
    println!("Room code: {}", code);

    let mut game = Game::new();
    for (id, color) in [("red", Color::Red), ("yellow", Color::Yellow)] {
        send(
            &mut stream,
            ClientEvent::GameAddPlayer(NewPlayer {
                id: id.to_string(),
                username: id.to_string(),
                color,
                bot: true,
            }),
        )
        .await?;
        let player = wait_for(&mut stream, |event| match event {
            ServerEvent::GameAddPlayer(player) => Some(player),
            _ => None,
        })
        .await?;
        game.add_player(player)?;
    }

    send(&mut stream, ClientEvent::GameStart).await?;
    let playing = wait_for(&mut stream, |event| match event {
        ServerEvent::GameStart { playing } => Some(playing),
        _ => None,
    })
    .await?;
    game.start(Some(&playing.id))?;

    let mut rng = rand::thread_rng();
    while game.winner().is_none() {
        let Some(current) = game.playing().cloned() else {
            break;
        };
        let open: Vec<usize> = (0..game.cols())
            .filter(|&col| game.cell(game.rows() - 1, col).is_none())
            .collect();
        let Some(&column) = open.choose(&mut rng) else {
            break;
        };

        send(
            &mut stream,
            ClientEvent::GameDropPiece {
                player_id: current.id.clone(),
                column: column as i32,
            },
        )
        .await?;
        let (player, column) = wait_for(&mut stream, |event| match event {
            ServerEvent::GameDropPiece { player, column } => Some((player, column)),
            _ => None,
        })
        .await?;
        game.drop_piece(&player.id, column)?;
        print_board(&game);
    }

    match game.winner() {
        Some(winner) if winner.is_draw() => println!("Game ended in a draw"),
        Some(winner) => println!("{} wins", winner.username()),
        None => println!("Game stopped without a result"),
    }

    send(&mut stream, ClientEvent::RoomLeave).await?;
    wait_for(&mut stream, |event| match event {
        ServerEvent::RoomLeft => Some(()),
        _ => None,
    })
    .await?;
    Ok(())
}
