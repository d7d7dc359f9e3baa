//! PPM escape and exclusion logic.
//!
//! For each token the predictor walks from the longest matching context
//! towards the root. At every node it offers the symbols not yet excluded
//! plus an escape slot; the token is either found there or the escape is
//! coded and the walk continues one order lower. Past the root a uniform
//! distribution over the whole alphabet and the end-of-stream slot resolves
//! anything that is left.

use std::io::{Read, Write};

use tracing::trace;

use super::exclusion::ExclusionSet;
use super::tree::{Context, ContextNode, NodeId, SymbolCount};
use super::{Model, Token};
use crate::coder::{ArithmeticDecoder, ArithmeticEncoder};
use crate::config::ModelConfig;
use crate::error::{PpmError, Result};

/// What a node offers for the current step.
#[derive(Debug, Clone, Copy)]
struct Offer {
    /// Sum of the candidate counts
    sum: u32,
    escape: u32,
}

impl Offer {
    #[inline]
    fn total(self) -> u32 {
        self.sum + self.escape
    }
}

/// Per-stream scratch state for coding tokens against a [`Model`].
///
/// Holds no statistics itself; it can be dropped and recreated between
/// streams without changing the output.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    exclusions: ExclusionSet,
    /// Nodes for orders `0..=L` of the current context
    chain: Vec<NodeId>,
    /// Symbols offered at the node being coded
    candidates: Vec<SymbolCount>,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols ruled out so far in the current step. Always empty between
    /// calls to [`encode`](Self::encode) / [`decode`](Self::decode).
    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Collect the candidates at `node`. Returns `None` when nothing is left
    /// to offer, in which case the node is skipped without coding anything.
    fn offer(&mut self, node: &ContextNode, config: &ModelConfig) -> Option<Offer> {
        self.candidates.clear();
        let mut sum = 0u32;
        for entry in node.stats() {
            if config.full_exclusions() && self.exclusions.contains(entry.symbol) {
                continue;
            }
            sum += entry.count;
            self.candidates.push(*entry);
        }
        if self.candidates.is_empty() {
            return None;
        }
        let escape = config
            .escape_method()
            .escape_weight(self.candidates.len() as u32, node.distinct());
        Some(Offer { sum, escape })
    }

    /// Rule out everything just offered, if full exclusions are on.
    fn exclude_candidates(&mut self, config: &ModelConfig) {
        if !config.full_exclusions() {
            return;
        }
        for entry in &self.candidates {
            self.exclusions.insert(entry.symbol);
        }
    }

    /// Cumulative position of `symbol` among the candidates.
    fn locate(&self, symbol: u32) -> Option<(u32, u32)> {
        let mut cum = 0u32;
        for entry in &self.candidates {
            if entry.symbol == symbol {
                return Some((cum, entry.count));
            }
            cum += entry.count;
        }
        None
    }

    /// Candidate whose cumulative interval contains `target`.
    fn resolve(&self, target: u32) -> Option<(u32, u32, u32)> {
        let mut cum = 0u32;
        for entry in &self.candidates {
            if target < cum + entry.count {
                return Some((entry.symbol, cum, entry.count));
            }
            cum += entry.count;
        }
        None
    }

    /// Uniform slot of `slot_symbol` over the alphabet plus end-of-stream,
    /// with excluded symbols squeezed out. Returns `(index, total)`.
    fn uniform_slot(&mut self, config: &ModelConfig, slot_symbol: u32) -> (u32, u32) {
        let excluded = self.exclusions.sorted();
        let below = excluded.partition_point(|&s| s < slot_symbol) as u32;
        let total = config.alphabet_size() + 1 - excluded.len() as u32;
        (slot_symbol - below, total)
    }

    /// Inverse of [`uniform_slot`](Self::uniform_slot).
    fn uniform_symbol(&mut self, index: u32) -> u32 {
        let mut symbol = index;
        for &excluded in self.exclusions.sorted() {
            if excluded <= symbol {
                symbol += 1;
            } else {
                break;
            }
        }
        symbol
    }

    fn uniform_total(&self, config: &ModelConfig) -> u32 {
        config.alphabet_size() + 1 - self.exclusions.len() as u32
    }

    /// Code `token` in the given context and update the model.
    pub fn encode<W: Write>(
        &mut self,
        model: &mut Model,
        context: &Context,
        token: Token,
        coder: &mut ArithmeticEncoder<W>,
    ) -> Result<()> {
        let config = model.config;
        let target = match token {
            Token::Symbol(symbol) => {
                if symbol >= config.alphabet_size() {
                    return Err(PpmError::SymbolOutOfRange {
                        symbol: u64::from(symbol),
                        alphabet_size: u64::from(config.alphabet_size()),
                    });
                }
                Some(symbol)
            }
            Token::EndOfStream => None,
        };

        self.exclusions.clear();
        model.tree.chain_into(context, &mut self.chain);

        let mut matched = None;
        for order in (0..self.chain.len()).rev() {
            let node = model.tree.node(self.chain[order]);
            let Some(offer) = self.offer(node, &config) else {
                continue;
            };
            let total = offer.total();
            if let Some((cum_low, count)) = target.and_then(|s| self.locate(s)) {
                trace!(order, cum_low, cum_high = cum_low + count, total, "symbol");
                coder.encode(cum_low, cum_low + count, total)?;
                matched = Some(order);
                break;
            }
            trace!(order, cum_low = offer.sum, cum_high = total, total, "escape");
            coder.encode(offer.sum, total, total)?;
            self.exclude_candidates(&config);
        }

        if matched.is_none() {
            let slot_symbol = target.unwrap_or(config.alphabet_size());
            let (index, total) = self.uniform_slot(&config, slot_symbol);
            trace!(cum_low = index, cum_high = index + 1, total, "uniform");
            coder.encode(index, index + 1, total)?;
        }

        if let Some(symbol) = target {
            self.update(model, context, symbol, matched);
        }
        self.exclusions.clear();
        Ok(())
    }

    /// Decode the next token in the given context and update the model.
    pub fn decode<R: Read>(
        &mut self,
        model: &mut Model,
        context: &Context,
        coder: &mut ArithmeticDecoder<R>,
    ) -> Result<Token> {
        let config = model.config;
        self.exclusions.clear();
        model.tree.chain_into(context, &mut self.chain);

        let mut decoded = None;
        for order in (0..self.chain.len()).rev() {
            let node = model.tree.node(self.chain[order]);
            let Some(offer) = self.offer(node, &config) else {
                continue;
            };
            let total = offer.total();
            let target = coder.decode_target(total)?;
            if target < offer.sum {
                let (symbol, cum_low, count) = self.resolve(target).ok_or_else(|| {
                    PpmError::CorruptStream(format!("no symbol at order {order} for {target}"))
                })?;
                trace!(order, cum_low, cum_high = cum_low + count, total, "symbol");
                coder.decode_consume(cum_low, cum_low + count, total)?;
                decoded = Some((symbol, order));
                break;
            }
            trace!(order, cum_low = offer.sum, cum_high = total, total, "escape");
            coder.decode_consume(offer.sum, total, total)?;
            self.exclude_candidates(&config);
        }

        let (token, matched) = match decoded {
            Some((symbol, order)) => (Token::Symbol(symbol), Some(order)),
            None => {
                let total = self.uniform_total(&config);
                let index = coder.decode_target(total)?;
                let symbol = self.uniform_symbol(index);
                if symbol > config.alphabet_size() || self.exclusions.contains(symbol) {
                    return Err(PpmError::CorruptStream(format!(
                        "uniform slot {index} of {total} does not map to a symbol"
                    )));
                }
                trace!(cum_low = index, cum_high = index + 1, total, "uniform");
                coder.decode_consume(index, index + 1, total)?;
                if symbol == config.alphabet_size() {
                    (Token::EndOfStream, None)
                } else {
                    (Token::Symbol(symbol), None)
                }
            }
        };

        if let Token::Symbol(symbol) = token {
            self.update(model, context, symbol, matched);
        }
        self.exclusions.clear();
        Ok(token)
    }

    /// Credit `symbol` after it was resolved at `matched` (`None` for the
    /// uniform fallback below the root).
    ///
    /// With update exclusions only orders at or above the match are
    /// credited; otherwise every order up to the current context length.
    /// Missing nodes along the context are created here.
    fn update(&mut self, model: &mut Model, context: &Context, symbol: u32, matched: Option<usize>) {
        let config = model.config;
        let increment = config.escape_method().increment();
        let lowest = if config.update_exclusions() {
            matched.unwrap_or(0)
        } else {
            0
        };
        let longest = context.len().min(config.max_order());

        let mut node = NodeId::ROOT;
        for order in 0..=longest {
            if order > 0 {
                let Some(edge) = context.back(order) else {
                    break;
                };
                node = model.tree.get_or_create(node, edge);
            }
            if order >= lowest {
                model.tree.increment(node, symbol, increment);
            }
        }
    }
}
