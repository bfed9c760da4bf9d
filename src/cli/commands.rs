//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - list/show: inspect stored animations
//! - place/sequence/delete/swap/shift/reverse: edit a map's animation file
//! - run: tick a map on a flat world and print what would be broadcast

use blockanim::domain::{BlockId, DeleteSelector, LoopIndex, Placement, Position, Tick};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Blockanim - tick-driven block animations for voxel maps
#[derive(Parser, Debug)]
#[command(name = "blockanim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Block coordinates given as three positional numbers
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct At {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl At {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Where new loops go in the cell
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementArgs {
    /// Add after the existing loops
    #[arg(long, conflicts_with_all = ["prepend", "index"])]
    pub append: bool,

    /// Add before the existing loops
    #[arg(long, conflicts_with = "index")]
    pub prepend: bool,

    /// Put the loop at this index
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub index: Option<LoopIndex>,
}

impl PlacementArgs {
    pub fn placement(&self) -> Placement {
        match (self.append, self.prepend, self.index) {
            (_, _, Some(index)) => Placement::At(index),
            (true, _, _) => Placement::Append,
            (_, true, _) => Placement::Prepend,
            _ => Placement::Overwrite,
        }
    }
}

/// Parse a `block:duration` frame
pub fn parse_frame(s: &str) -> Result<(BlockId, u16), String> {
    let (block, duration) = s
        .split_once(':')
        .ok_or_else(|| format!("expected block:duration, got {:?}", s))?;
    let block = block.parse().map_err(|_| format!("invalid block id {:?}", block))?;
    let duration = duration.parse().map_err(|_| format!("invalid duration {:?}", duration))?;
    Ok((block, duration))
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List maps that have stored animations
    List,

    /// Show the loops stored for a map
    Show {
        map: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Place a single loop
    Place {
        map: String,

        #[command(flatten)]
        at: At,

        /// Period in ticks
        interval: u16,

        /// Visible ticks per period
        duration: u16,

        /// First tick of the loop
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        start: i32,

        /// Tick after which the loop freezes
        #[arg(long)]
        end: Option<Tick>,

        /// Block shown while visible
        #[arg(short, long, default_value_t = 1)]
        block: BlockId,

        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Place a block sequence, each frame as block:duration
    Sequence {
        map: String,

        #[command(flatten)]
        at: At,

        /// Frames in play order
        #[arg(required = true, value_parser = parse_frame)]
        frames: Vec<(BlockId, u16)>,

        /// First tick of the sequence
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        start: i32,

        /// Tick after which the sequence freezes
        #[arg(long)]
        end: Option<Tick>,

        #[command(flatten)]
        placement: PlacementArgs,
    },

    /// Delete loops at a position
    Delete {
        map: String,

        #[command(flatten)]
        at: At,

        /// Only the loop at this index
        #[arg(long, conflicts_with = "block")]
        index: Option<LoopIndex>,

        /// Only loops showing this block
        #[arg(long)]
        block: Option<BlockId>,
    },

    /// Swap two loop indices (0 means the smallest index)
    Swap {
        map: String,

        #[command(flatten)]
        at: At,

        first: LoopIndex,
        second: LoopIndex,
    },

    /// Delay every loop at a position
    Shift {
        map: String,

        #[command(flatten)]
        at: At,

        #[arg(allow_hyphen_values = true)]
        delay: i32,
    },

    /// Play the loops at a position backwards
    Reverse {
        map: String,

        #[command(flatten)]
        at: At,
    },

    /// Tick a map on a flat world and print every broadcast
    Run {
        map: String,

        /// Number of ticks to run
        #[arg(short, long, default_value_t = 20)]
        ticks: u32,

        /// Run on the wall clock instead of as fast as possible
        #[arg(long)]
        realtime: bool,
    },
}

impl Commands {
    /// Delete selector from the delete flags
    pub fn delete_selector(index: Option<LoopIndex>, block: Option<BlockId>) -> DeleteSelector {
        match (index, block) {
            (Some(index), _) => DeleteSelector::Index(index),
            (None, Some(block)) => DeleteSelector::Block(block),
            (None, None) => DeleteSelector::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["blockanim"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["blockanim", "-v", "list"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["blockanim", "-c", "/path/to/blockanim.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/blockanim.yml")));
    }

    #[test]
    fn test_show_json() {
        let cli = Cli::try_parse_from(["blockanim", "show", "lobby", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Show { map, json }) => {
                assert_eq!(map, "lobby");
                assert!(json);
            }
            _ => panic!("Expected show command"),
        }
    }

    #[test]
    fn test_place_defaults() {
        let cli = Cli::try_parse_from(["blockanim", "place", "lobby", "10", "20", "30", "10", "3"]).unwrap();
        match cli.command {
            Some(Commands::Place {
                at,
                interval,
                duration,
                start,
                end,
                block,
                placement,
                ..
            }) => {
                assert_eq!(at.position(), Position::new(10, 20, 30));
                assert_eq!((interval, duration, start, end, block), (10, 3, 0, None, 1));
                assert_eq!(placement.placement(), Placement::Overwrite);
            }
            _ => panic!("Expected place command"),
        }
    }

    #[test]
    fn test_place_negative_start_and_append() {
        let cli = Cli::try_parse_from([
            "blockanim", "place", "lobby", "1", "2", "3", "8", "2", "--start", "-5", "--append", "-b", "49",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Place {
                start, block, placement, ..
            }) => {
                assert_eq!(start, -5);
                assert_eq!(block, 49);
                assert_eq!(placement.placement(), Placement::Append);
            }
            _ => panic!("Expected place command"),
        }
    }

    #[test]
    fn test_place_index_conflicts_with_append() {
        let result = Cli::try_parse_from([
            "blockanim", "place", "lobby", "1", "2", "3", "8", "2", "--append", "--index", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_place_index_zero_rejected() {
        let result = Cli::try_parse_from(["blockanim", "place", "lobby", "1", "2", "3", "8", "2", "--index", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sequence_frames() {
        let cli = Cli::try_parse_from(["blockanim", "sequence", "lobby", "0", "0", "0", "21:2", "23:3", "25:1"]).unwrap();
        match cli.command {
            Some(Commands::Sequence { frames, start, .. }) => {
                assert_eq!(frames, vec![(21, 2), (23, 3), (25, 1)]);
                assert_eq!(start, 0);
            }
            _ => panic!("Expected sequence command"),
        }
    }

    #[test]
    fn test_parse_frame_errors() {
        assert!(parse_frame("21").is_err());
        assert!(parse_frame("x:2").is_err());
        assert!(parse_frame("21:y").is_err());
    }

    #[test]
    fn test_delete_selectors() {
        let cli = Cli::try_parse_from(["blockanim", "delete", "lobby", "1", "2", "3", "--block", "7"]).unwrap();
        match cli.command {
            Some(Commands::Delete { index, block, .. }) => {
                assert_eq!(Commands::delete_selector(index, block), DeleteSelector::Block(7));
            }
            _ => panic!("Expected delete command"),
        }
        assert_eq!(Commands::delete_selector(None, None), DeleteSelector::All);
        assert_eq!(Commands::delete_selector(Some(2), None), DeleteSelector::Index(2));
    }

    #[test]
    fn test_shift_negative_delay() {
        let cli = Cli::try_parse_from(["blockanim", "shift", "lobby", "1", "2", "3", "-4"]).unwrap();
        match cli.command {
            Some(Commands::Shift { delay, .. }) => assert_eq!(delay, -4),
            _ => panic!("Expected shift command"),
        }
    }

    #[test]
    fn test_run_ticks() {
        let cli = Cli::try_parse_from(["blockanim", "run", "lobby", "--ticks", "5"]).unwrap();
        match cli.command {
            Some(Commands::Run { map, ticks, realtime }) => {
                assert_eq!(map, "lobby");
                assert_eq!(ticks, 5);
                assert!(!realtime);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_help_works() {
        // Verify help doesn't panic
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let result = Cli::try_parse_from(["blockanim", "--version"]);
        // Version flag causes early exit with error (expected)
        assert!(result.is_err());
    }
}
