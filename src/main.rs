use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bracket_scheduler::{
    config::{default_config_path, load_config},
    init_tracing, EliminationGenerator, PairingGenerator, Round, Team, TeamId,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

#[derive(Parser, Debug, Clone)]
#[command(name = "bracket", version, about = "Elimination bracket scheduler")]
struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ./bracket.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured elimination count (1 or 2).
    #[arg(long, global = true)]
    eliminations: Option<u8>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print the pairings that can be played next.
    NextRound {
        /// Tournament file with teams and recorded rounds.
        file: PathBuf,

        /// Maximum number of pairings to schedule.
        #[arg(long)]
        places: Option<usize>,
    },

    /// Print the final standings.
    Rankings { file: PathBuf },
}

#[derive(Debug, Deserialize)]
struct TournamentFile {
    teams: Vec<TeamEntry>,
    #[serde(default)]
    rounds: Vec<Round>,
}

#[derive(Debug, Deserialize)]
struct TeamEntry {
    id: TeamId,
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

struct Names(HashMap<TeamId, String>);

impl Names {
    fn get(&self, team: TeamId) -> String {
        self.0
            .get(&team)
            .cloned()
            .unwrap_or_else(|| format!("team {team}"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = load_config(&config_path)?;
    if let Some(eliminations) = cli.eliminations {
        config.eliminations = eliminations;
    }
    let _guard = init_tracing(&config)?;

    let file = match &cli.command {
        Command::NextRound { file, .. } | Command::Rankings { file } => file,
    };
    let (teams, rounds, names) = read_tournament(file)?;
    let mut generator = EliminationGenerator::new(config.bracket_options())?;
    generator
        .load_state(&teams, &rounds)
        .with_context(|| format!("load {}", file.display()))?;
    info!(format = generator.name(), file = %file.display(), "tournament loaded");

    match cli.command {
        Command::NextRound { places, .. } => {
            let round = generator.create_next_round(places.or(config.places))?;
            print_round(round.as_ref(), &names, cli.json)
        }
        Command::Rankings { .. } => {
            let rankings = generator.generate_rankings()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rankings)?);
                return Ok(());
            }
            for ranking in rankings {
                println!("{:>3}. {} ({})", ranking.rank, names.get(ranking.team), ranking.description);
            }
            Ok(())
        }
    }
}

fn read_tournament(path: &Path) -> Result<(Vec<Team>, Vec<Round>, Names)> {
    let data = fs::read_to_string(path).with_context(|| format!("read tournament {}", path.display()))?;
    let parsed = serde_json::from_str::<TournamentFile>(&data)
        .with_context(|| format!("parse tournament {}", path.display()))?;
    let mut names = HashMap::new();
    let mut teams = Vec::with_capacity(parsed.teams.len());
    for entry in parsed.teams {
        if let Some(name) = entry.name {
            names.insert(entry.id, name);
        }
        teams.push(Team {
            id: entry.id,
            rating: entry.rating,
        });
    }
    Ok((teams, parsed.rounds, Names(names)))
}

fn print_round(round: Option<&Round>, names: &Names, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&round)?);
        return Ok(());
    }
    let Some(round) = round else {
        println!("Tournament finished.");
        return Ok(());
    };
    for pairing in &round.pairings {
        match pairing.teams().as_slice() {
            [team] => println!("{} (bye)", names.get(*team)),
            [a, b] => println!("{} vs {}", names.get(*a), names.get(*b)),
            _ => {}
        }
    }
    Ok(())
}
