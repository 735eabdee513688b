//! The table state machine.
//!
//! A round cycles `betting -> playing -> dealer -> settlement -> betting`.
//! Each phase is a typestate wrapped by [`RoundState`]; player intents are
//! validated against the current phase and rejected with a typed
//! [`TableError`] without mutating anything. Timed behavior (dealer pacing,
//! the settlement delay, the decision timeout) advances through
//! [`RoundState::step`], which the table actor drives once per tick.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::deck::{Deck, Verification};
use super::entities::{
    Card, Chips, Dealer, PlayStatus, Player, PlayerAction, RoundOutcome, RoundStage, SeatIndex,
    TableView, Username,
};
use super::scoring::{self, BLACKJACK, Score};
use super::settlement;
use super::states::{Betting, DealerTurn, Settling, Turns};

pub const DEFAULT_MAX_PLAYERS: usize = 5;
pub const DEFAULT_MIN_BET: Chips = 1;
/// Ticks between dealer reveal/draw steps.
pub const DEFAULT_DEALER_DELAY_TICKS: u32 = 3;
/// Ticks the final hands stay on display before the next round.
pub const DEFAULT_SETTLE_DELAY_TICKS: u32 = 3;
/// Ticks a player may hold the turn before being forced to stand.
pub const DEFAULT_TURN_TIMEOUT_TICKS: u32 = 30;

/// Errors from player intents. Never fatal to the table: an error leaves
/// the round untouched and is reported to the originating client only.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TableError {
    #[error("table is full")]
    CapacityReached,
    #[error("username already taken at this table")]
    UserAlreadyExists,
    #[error("not seated at this table")]
    UserDoesNotExist,
    #[error("bets are closed while cards are in play")]
    BetsClosed,
    #[error("bet already placed")]
    AlreadyBet,
    #[error("illegal bet of {amount} with {chips} behind")]
    InvalidBet { amount: Chips, chips: Chips },
    #[error("place a bet before starting the round")]
    NoBet,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("no actions allowed right now")]
    NoActionsAllowed,
    #[error("double down requires exactly two cards and chips to cover the bet")]
    IllegalDoubleDown,
    #[error("insurance is not available")]
    InsuranceUnavailable,
    #[error("round already in progress")]
    RoundInProgress,
}

/// Events that occur during a round, drained by the table actor and fanned
/// out to clients as the game log.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum RoundEvent {
    Joined(Username, SeatIndex),
    Left(Username),
    BetPlaced(Username, Chips),
    RoundStarted,
    Hit(Username, Card),
    Stood(Username, Score),
    Busted(Username, Score),
    DoubledDown(Username, Card),
    InsuranceTaken(Username, Chips),
    TurnTimedOut(Username),
    DealerReveal(Card),
    DealerBlackjack,
    DealerDraw(Card),
    DealerStand(Score),
    DealerBust(Score),
    Settled(Username, RoundOutcome, Chips),
    InsurancePaid(Username, Chips),
    InsuranceForfeited(Username, Chips),
    NewRound,
}

impl fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Joined(username, seat) => format!("{username} joined the table (seat {seat})"),
            Self::Left(username) => format!("{username} left the table"),
            Self::BetPlaced(username, amount) => format!("{username} bets {amount}"),
            Self::RoundStarted => "cards are dealt".to_string(),
            Self::Hit(username, card) => format!("{username} hits and draws {card}"),
            Self::Stood(username, score) => format!("{username} stands with {score}"),
            Self::Busted(username, score) => format!("{username} busts with {score}"),
            Self::DoubledDown(username, card) => {
                format!("{username} doubles down and draws {card}")
            }
            Self::InsuranceTaken(username, stake) => {
                format!("{username} takes insurance for {stake}")
            }
            Self::TurnTimedOut(username) => format!("{username} ran out of time and stands"),
            Self::DealerReveal(card) => format!("dealer reveals the hole card: {card}"),
            Self::DealerBlackjack => "dealer has blackjack".to_string(),
            Self::DealerDraw(card) => format!("dealer draws {card}"),
            Self::DealerStand(score) => format!("dealer stands at {score}"),
            Self::DealerBust(score) => format!("dealer busts with {score}"),
            Self::Settled(username, outcome, credit) => match outcome {
                RoundOutcome::Blackjack => format!("blackjack! {username} is paid {credit}"),
                RoundOutcome::Win => format!("{username} wins and is paid {credit}"),
                RoundOutcome::Push => format!("{username} pushes, bet returned"),
                RoundOutcome::Lose => format!("{username} loses"),
            },
            Self::InsurancePaid(username, credit) => {
                format!("insurance pays {username} {credit}")
            }
            Self::InsuranceForfeited(username, stake) => {
                format!("{username}'s insurance of {stake} is forfeited")
            }
            Self::NewRound => "new round, place your bets".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// Table rules and pacing. Delays are in ticks; the actor ticks once per
/// second.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableSettings {
    pub max_players: usize,
    pub min_bet: Chips,
    pub dealer_delay_ticks: u32,
    pub settle_delay_ticks: u32,
    pub turn_timeout_ticks: u32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            min_bet: DEFAULT_MIN_BET,
            dealer_delay_ticks: DEFAULT_DEALER_DELAY_TICKS,
            settle_delay_ticks: DEFAULT_SETTLE_DELAY_TICKS,
            turn_timeout_ticks: DEFAULT_TURN_TIMEOUT_TICKS,
        }
    }
}

/// Mutable table data shared across all phases. The table exclusively owns
/// its deck, dealer, and players; nothing here is shared across tables.
#[derive(Debug)]
pub struct TableData {
    pub(crate) deck: Deck,
    pub(crate) dealer: Dealer,
    /// Seat order is turn order.
    pub(crate) seats: Vec<Player>,
    pub(crate) events: VecDeque<RoundEvent>,
    pub(crate) settings: TableSettings,
}

impl TableData {
    fn new(settings: TableSettings) -> Self {
        Self {
            deck: Deck::default(),
            dealer: Dealer::default(),
            seats: Vec::with_capacity(settings.max_players),
            events: VecDeque::new(),
            settings,
        }
    }

    fn seat_of(&self, username: &Username) -> Option<SeatIndex> {
        self.seats.iter().position(|player| &player.name == username)
    }

    fn push_event(&mut self, event: RoundEvent) {
        self.events.push_back(event);
    }

    fn bettors(&self) -> usize {
        self.seats.iter().filter(|player| player.bet > 0).count()
    }

    /// The canonical turn rule: the earliest seated player with a bet who
    /// is not finished, or `None` once the dealer should play. Every
    /// turn-advance and dealer-trigger decision goes through here.
    fn next_eligible(&self) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|player| player.bet > 0 && !player.is_finished())
    }

    fn view_with(&self, stage: RoundStage, hide_hole: bool, turn: Option<SeatIndex>) -> TableView {
        TableView {
            stage,
            dealer: super::entities::DealerView::masked(&self.dealer, hide_hole),
            players: self
                .seats
                .iter()
                .enumerate()
                .map(|(seat, player)| super::entities::PlayerView::of(player, seat))
                .collect(),
            turn: turn.and_then(|seat| self.seats.get(seat).map(|player| player.name.clone())),
        }
    }
}

/// A table in one phase of the round, holding the shared data and the
/// phase's own state.
#[derive(Debug)]
pub struct Table<T> {
    pub(crate) data: TableData,
    pub(crate) state: T,
}

impl<T> Table<T> {
    /// Seats a new player. Allowed in any phase; a player joining mid-round
    /// has no bet and sits out until the next betting phase.
    fn join(&mut self, username: &Username, chips: Chips) -> Result<SeatIndex, TableError> {
        if self.data.seats.len() >= self.data.settings.max_players {
            return Err(TableError::CapacityReached);
        }
        if self.data.seat_of(username).is_some() {
            return Err(TableError::UserAlreadyExists);
        }
        let seat = self.data.seats.len();
        self.data.seats.push(Player::new(username.clone(), chips));
        self.data.push_event(RoundEvent::Joined(username.clone(), seat));
        Ok(seat)
    }

    /// Removes a seat and returns the departing player. A live bet is
    /// forfeited; the caller persists the remaining chips.
    fn unseat(&mut self, username: &Username) -> Result<Player, TableError> {
        let seat = self
            .data
            .seat_of(username)
            .ok_or(TableError::UserDoesNotExist)?;
        let player = self.data.seats.remove(seat);
        self.data.push_event(RoundEvent::Left(username.clone()));
        Ok(player)
    }
}

/// Operations available in every phase.
#[enum_dispatch]
pub trait TableStateManagement {
    fn drain_events(&mut self) -> VecDeque<RoundEvent>;

    /// The outbound snapshot for this phase, hidden-card masking applied.
    #[must_use]
    fn view(&self) -> TableView;

    fn stage(&self) -> RoundStage;
}

impl Table<Betting> {
    pub fn new(settings: TableSettings) -> Self {
        Self {
            data: TableData::new(settings),
            state: Betting::default(),
        }
    }

    fn place_bet(&mut self, username: &Username, amount: Chips) -> Result<(), TableError> {
        let seat = self
            .data
            .seat_of(username)
            .ok_or(TableError::UserDoesNotExist)?;
        let min_bet = self.data.settings.min_bet;
        let player = &mut self.data.seats[seat];
        if player.bet > 0 {
            return Err(TableError::AlreadyBet);
        }
        if amount < min_bet || amount > player.chips {
            return Err(TableError::InvalidBet {
                amount,
                chips: player.chips,
            });
        }
        player.chips -= amount;
        player.bet = amount;
        self.data
            .push_event(RoundEvent::BetPlaced(username.clone(), amount));
        Ok(())
    }

    fn start_round(&mut self, username: &Username) -> Result<(), TableError> {
        let seat = self
            .data
            .seat_of(username)
            .ok_or(TableError::UserDoesNotExist)?;
        if self.data.seats[seat].bet == 0 {
            return Err(TableError::NoBet);
        }
        self.state.start_requested = true;
        Ok(())
    }

    /// Dealing starts once a bettor asked for it, or once every seated
    /// player has either bet or run out of chips.
    fn ready_to_deal(&self) -> bool {
        self.data.bettors() > 0
            && (self.state.start_requested
                || self
                    .data
                    .seats
                    .iter()
                    .all(|player| player.bet > 0 || player.chips == 0))
    }

    /// Deals two passes of one card per bettor plus one to the dealer, as a
    /// live table would; the dealer's second card is the hole card.
    fn deal(mut self) -> Table<Turns> {
        self.data.deck.open_round();
        for _ in 0..2 {
            for seat in 0..self.data.seats.len() {
                if self.data.seats[seat].bet > 0 {
                    let card = self.data.deck.draw();
                    self.data.seats[seat].hand.push(card);
                }
            }
            let card = self.data.deck.draw();
            self.data.dealer.hand.push(card);
        }
        for player in &mut self.data.seats {
            if player.bet > 0 {
                player.status = PlayStatus::Playing;
            }
        }
        self.data.push_event(RoundEvent::RoundStarted);
        let turn = self.data.next_eligible();
        Table {
            data: self.data,
            state: Turns {
                turn,
                idle_ticks: 0,
            },
        }
    }
}

impl TableStateManagement for Table<Betting> {
    fn drain_events(&mut self) -> VecDeque<RoundEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn view(&self) -> TableView {
        self.data.view_with(RoundStage::Betting, true, None)
    }

    fn stage(&self) -> RoundStage {
        RoundStage::Betting
    }
}

impl Table<Turns> {
    fn act(&mut self, username: &Username, action: PlayerAction) -> Result<(), TableError> {
        let seat = self
            .data
            .seat_of(username)
            .ok_or(TableError::UserDoesNotExist)?;
        if self.state.turn != Some(seat) {
            return Err(TableError::OutOfTurnAction);
        }
        match action {
            PlayerAction::Hit => {
                let card = self.data.deck.draw();
                let player = &mut self.data.seats[seat];
                player.hand.push(card);
                self.data
                    .push_event(RoundEvent::Hit(username.clone(), card));
                let score = self.data.seats[seat].score();
                if score > BLACKJACK {
                    self.data.seats[seat].status = PlayStatus::Busted;
                    self.data
                        .push_event(RoundEvent::Busted(username.clone(), score));
                    self.advance_turn();
                } else {
                    self.state.idle_ticks = 0;
                }
            }
            PlayerAction::Stand => {
                self.data.seats[seat].status = PlayStatus::Stood;
                let score = self.data.seats[seat].score();
                self.data
                    .push_event(RoundEvent::Stood(username.clone(), score));
                self.advance_turn();
            }
            PlayerAction::DoubleDown => {
                let player = &self.data.seats[seat];
                if player.hand.len() != 2 || player.chips < player.bet {
                    return Err(TableError::IllegalDoubleDown);
                }
                let card = self.data.deck.draw();
                let player = &mut self.data.seats[seat];
                player.chips -= player.bet;
                player.bet *= 2;
                player.hand.push(card);
                self.data
                    .push_event(RoundEvent::DoubledDown(username.clone(), card));
                let score = self.data.seats[seat].score();
                if score > BLACKJACK {
                    self.data.seats[seat].status = PlayStatus::Busted;
                    self.data
                        .push_event(RoundEvent::Busted(username.clone(), score));
                } else {
                    self.data.seats[seat].status = PlayStatus::Doubled;
                }
                self.advance_turn();
            }
        }
        Ok(())
    }

    fn take_insurance(&mut self, username: &Username) -> Result<(), TableError> {
        let seat = self
            .data
            .seat_of(username)
            .ok_or(TableError::UserDoesNotExist)?;
        let ace_up = self
            .data
            .dealer
            .upcard()
            .is_some_and(|card| card.rank.is_ace());
        let player = &self.data.seats[seat];
        let stake = player.bet / 2;
        if !ace_up || player.bet == 0 || player.is_finished() || player.insurance > 0 {
            return Err(TableError::InsuranceUnavailable);
        }
        if stake == 0 || player.chips < stake {
            return Err(TableError::InsuranceUnavailable);
        }
        let player = &mut self.data.seats[seat];
        player.chips -= stake;
        player.insurance = stake;
        self.data
            .push_event(RoundEvent::InsuranceTaken(username.clone(), stake));
        Ok(())
    }

    /// One tick of the decision clock; a player over the limit is forced to
    /// stand.
    fn tick_turn_clock(&mut self) {
        let Some(seat) = self.state.turn else {
            return;
        };
        self.state.idle_ticks += 1;
        if self.state.idle_ticks >= self.data.settings.turn_timeout_ticks {
            let username = self.data.seats[seat].name.clone();
            self.data.seats[seat].status = PlayStatus::Stood;
            self.data.push_event(RoundEvent::TurnTimedOut(username));
            self.advance_turn();
        }
    }

    fn advance_turn(&mut self) {
        self.state.turn = self.data.next_eligible();
        self.state.idle_ticks = 0;
    }

    fn into_dealer(self) -> Table<DealerTurn> {
        Table {
            data: self.data,
            state: DealerTurn {
                revealed: false,
                // One-tick pause before the reveal, for pacing.
                cooldown: 1,
            },
        }
    }
}

impl TableStateManagement for Table<Turns> {
    fn drain_events(&mut self) -> VecDeque<RoundEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn view(&self) -> TableView {
        self.data
            .view_with(RoundStage::Playing, true, self.state.turn)
    }

    fn stage(&self) -> RoundStage {
        RoundStage::Playing
    }
}

impl Table<DealerTurn> {
    fn reveal(&mut self) {
        self.state.revealed = true;
        self.state.cooldown = self.data.settings.dealer_delay_ticks;
        if let Some(card) = self.data.dealer.hole_card() {
            self.data.push_event(RoundEvent::DealerReveal(card));
        }
        if scoring::is_blackjack(&self.data.dealer.hand) {
            self.data.push_event(RoundEvent::DealerBlackjack);
        }
    }

    /// Stand-on-17 policy; a natural blackjack skips drawing entirely.
    fn dealer_done(&self) -> bool {
        scoring::is_blackjack(&self.data.dealer.hand) || self.data.dealer.score() >= 17
    }

    fn dealer_draw(&mut self) {
        let card = self.data.deck.draw();
        self.data.dealer.hand.push(card);
        self.data.push_event(RoundEvent::DealerDraw(card));
        self.state.cooldown = self.data.settings.dealer_delay_ticks;
    }

    /// Applies settlement exactly once and moves to the display delay.
    /// There is no other path into `Settling`, which is what makes
    /// re-settlement unrepresentable.
    fn into_settling(mut self) -> Table<Settling> {
        let score = self.data.dealer.score();
        if !scoring::is_blackjack(&self.data.dealer.hand) {
            if score > BLACKJACK {
                self.data.push_event(RoundEvent::DealerBust(score));
            } else {
                self.data.push_event(RoundEvent::DealerStand(score));
            }
        }

        let entries = settlement::settle(&self.data.dealer.hand, &self.data.seats);
        for entry in entries {
            let Some(seat) = self.data.seat_of(&entry.username) else {
                continue;
            };
            let player = &mut self.data.seats[seat];
            player.chips += entry.main_credit + entry.insurance_credit;
            player.outcome = Some(entry.outcome);
            let insurance = player.insurance;
            self.data.push_event(RoundEvent::Settled(
                entry.username.clone(),
                entry.outcome,
                entry.main_credit,
            ));
            if insurance > 0 {
                if entry.insurance_credit > 0 {
                    self.data.push_event(RoundEvent::InsurancePaid(
                        entry.username,
                        entry.insurance_credit,
                    ));
                } else {
                    self.data
                        .push_event(RoundEvent::InsuranceForfeited(entry.username, insurance));
                }
            }
        }
        self.data.deck.close_round();

        let ticks_remaining = self.data.settings.settle_delay_ticks;
        Table {
            data: self.data,
            state: Settling { ticks_remaining },
        }
    }
}

impl TableStateManagement for Table<DealerTurn> {
    fn drain_events(&mut self) -> VecDeque<RoundEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn view(&self) -> TableView {
        self.data
            .view_with(RoundStage::Dealer, !self.state.revealed, None)
    }

    fn stage(&self) -> RoundStage {
        RoundStage::Dealer
    }
}

impl Table<Settling> {
    /// Clears every round-scoped field (chips are retained) and rebuilds
    /// the deck under fresh seeds for the next round.
    fn reset(mut self) -> Table<Betting> {
        for player in &mut self.data.seats {
            player.reset_round();
        }
        self.data.dealer.reset();
        self.data.deck = Deck::new(None, None);
        self.data.push_event(RoundEvent::NewRound);
        Table {
            data: self.data,
            state: Betting::default(),
        }
    }
}

impl TableStateManagement for Table<Settling> {
    fn drain_events(&mut self) -> VecDeque<RoundEvent> {
        std::mem::take(&mut self.data.events)
    }

    fn view(&self) -> TableView {
        self.data.view_with(RoundStage::Settlement, false, None)
    }

    fn stage(&self) -> RoundStage {
        RoundStage::Settlement
    }
}

/// The round lifecycle as a single enum, one variant per phase.
#[enum_dispatch(TableStateManagement)]
#[derive(Debug)]
pub enum RoundState {
    Betting(Table<Betting>),
    Turns(Table<Turns>),
    DealerTurn(Table<DealerTurn>),
    Settling(Table<Settling>),
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(TableSettings::default())
    }
}

impl RoundState {
    #[must_use]
    pub fn new(settings: TableSettings) -> Self {
        Self::Betting(Table::new(settings))
    }

    /// Advances timed behavior by one tick, possibly changing phase. All
    /// phase transitions happen here, so a caller holding `&mut self`
    /// between ticks can never observe a half-finished transition.
    #[must_use]
    pub fn step(self) -> Self {
        match self {
            Self::Betting(table) => {
                if table.ready_to_deal() {
                    Self::Turns(table.deal())
                } else {
                    Self::Betting(table)
                }
            }
            Self::Turns(mut table) => {
                if table.state.turn.is_none() {
                    Self::DealerTurn(table.into_dealer())
                } else {
                    table.tick_turn_clock();
                    Self::Turns(table)
                }
            }
            Self::DealerTurn(mut table) => {
                if table.state.cooldown > 1 {
                    table.state.cooldown -= 1;
                    Self::DealerTurn(table)
                } else if !table.state.revealed {
                    table.reveal();
                    Self::DealerTurn(table)
                } else if table.dealer_done() {
                    Self::Settling(table.into_settling())
                } else {
                    table.dealer_draw();
                    Self::DealerTurn(table)
                }
            }
            Self::Settling(mut table) => {
                if table.state.ticks_remaining > 0 {
                    table.state.ticks_remaining -= 1;
                    Self::Settling(table)
                } else {
                    Self::Betting(table.reset())
                }
            }
        }
    }

    pub fn join_player(
        &mut self,
        username: &Username,
        chips: Chips,
    ) -> Result<SeatIndex, TableError> {
        match self {
            Self::Betting(table) => table.join(username, chips),
            Self::Turns(table) => table.join(username, chips),
            Self::DealerTurn(table) => table.join(username, chips),
            Self::Settling(table) => table.join(username, chips),
        }
    }

    /// Removes a player, treating a removal mid-turn as an implicit stand:
    /// the turn advances by the canonical rule. Returns the chips to
    /// persist; a live bet is forfeited.
    pub fn remove_player(&mut self, username: &Username) -> Result<Chips, TableError> {
        match self {
            Self::Betting(table) => Ok(table.unseat(username)?.chips),
            Self::Turns(table) => {
                let seat = table
                    .data
                    .seat_of(username)
                    .ok_or(TableError::UserDoesNotExist)?;
                let player = table.unseat(username)?;
                match table.state.turn {
                    Some(turn) if turn == seat => table.advance_turn(),
                    Some(turn) if turn > seat => table.state.turn = Some(turn - 1),
                    _ => {}
                }
                Ok(player.chips)
            }
            Self::DealerTurn(table) => Ok(table.unseat(username)?.chips),
            Self::Settling(table) => Ok(table.unseat(username)?.chips),
        }
    }

    pub fn place_bet(&mut self, username: &Username, amount: Chips) -> Result<(), TableError> {
        match self {
            Self::Betting(table) => table.place_bet(username, amount),
            _ => Err(TableError::BetsClosed),
        }
    }

    pub fn take_action(
        &mut self,
        username: &Username,
        action: PlayerAction,
    ) -> Result<(), TableError> {
        match self {
            Self::Turns(table) => table.act(username, action),
            _ => Err(TableError::NoActionsAllowed),
        }
    }

    pub fn take_insurance(&mut self, username: &Username) -> Result<(), TableError> {
        match self {
            Self::Turns(table) => table.take_insurance(username),
            _ => Err(TableError::InsuranceUnavailable),
        }
    }

    pub fn start_round(&mut self, username: &Username) -> Result<(), TableError> {
        match self {
            Self::Betting(table) => table.start_round(username),
            _ => Err(TableError::RoundInProgress),
        }
    }

    /// Current shuffle verification; the full ordering is sealed while the
    /// round is open.
    pub fn verification(&self) -> Verification {
        self.data().deck.verification()
    }

    pub fn contains_player(&self, username: &Username) -> bool {
        self.data().seat_of(username).is_some()
    }

    pub fn player_count(&self) -> usize {
        self.data().seats.len()
    }

    fn data(&self) -> &TableData {
        match self {
            Self::Betting(table) => &table.data,
            Self::Turns(table) => &table.data,
            Self::DealerTurn(table) => &table.data,
            Self::Settling(table) => &table.data,
        }
    }
}
