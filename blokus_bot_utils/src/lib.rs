use blokus::{Board, Color, ItemChoice, ItemContext, Okay, PieceSet, PlayTurnResponse, Request};

/// A trait to simplify writing bots.
pub trait Bot {
    fn new_game(&mut self, color: Color);

    /// Called when the bot holds item cards. Skips by default.
    fn item_phase(&mut self, _context: ItemContext) -> ItemChoice {
        ItemChoice::default()
    }

    fn play_turn(
        &mut self,
        board: Board,
        pieces: PieceSet,
        blocked: Vec<(i8, i8)>,
        big_piece_ban: bool,
    ) -> PlayTurnResponse;

    fn run(&mut self) -> anyhow::Result<()> {
        // Communication happens through stdin/stdout.
        // Stderr can be used for logging.
        let mut stdin = std::io::stdin().lock();
        let mut stdout = std::io::stdout().lock();
        let mut buf = String::new();

        loop {
            // Read the next line into buf
            buf.clear(); // because stdin.read_line() appends to the buffer
            use std::io::BufRead;
            let num_bytes_read = stdin.read_line(&mut buf)?;
            if num_bytes_read == 0 {
                // 0 bytes read means EOF - the judge has exited.
                break Ok(());
            }

            let req = serde_json::from_str::<Request>(buf.trim_end())?;

            match req {
                Request::NewGame { color } => {
                    self.new_game(color);
                    serde_json::to_writer(&mut stdout, &Okay())?;
                }
                Request::ItemPhase { context } => {
                    serde_json::to_writer(&mut stdout, &self.item_phase(context))?
                }
                Request::PlayTurn {
                    board,
                    pieces,
                    blocked,
                    big_piece_ban,
                } => serde_json::to_writer(
                    &mut stdout,
                    &self.play_turn(board, pieces, blocked, big_piece_ban),
                )?,
                Request::Bye => break Ok(()),
            }
            use std::io::Write;
            writeln!(stdout)?;
            stdout.flush()?;
        }
    }
}
