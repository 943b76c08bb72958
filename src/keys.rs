//! Scope key scheme.
//!
//! Every collection name is `family_tag ‖ role_tag ‖ identifier bytes`. Each
//! family owns exactly one scope shape, so identifiers within a family are
//! fixed width and two different scopes can never produce the same name.
//! Scratch collections start with `SCRATCH_TAG`, which no family uses.

use crate::error::{QueryError, Result};
use crate::types::{Hash160, HASH160_LEN};

pub const SCRATCH_TAG: u8 = b'~';

/// Logical collection identity. Reconciliation never crosses scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Chain-wide aggregate index (rich list).
    All,
    Address(Hash160),
    Token { code_hash: Hash160, genesis: Hash160 },
    TokenOwner { code_hash: Hash160, genesis: Hash160, address: Hash160 },
    Nft { code_hash: Hash160, nft_id: Hash160 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeShape {
    All,
    Address,
    Token,
    TokenOwner,
    Nft,
}

impl Scope {
    pub fn shape(&self) -> ScopeShape {
        match self {
            Scope::All => ScopeShape::All,
            Scope::Address(_) => ScopeShape::Address,
            Scope::Token { .. } => ScopeShape::Token,
            Scope::TokenOwner { .. } => ScopeShape::TokenOwner,
            Scope::Nft { .. } => ScopeShape::Nft,
        }
    }

    /// Raw identifier bytes in declaration order.
    pub fn id_bytes(&self) -> Vec<u8> {
        match self {
            Scope::All => Vec::new(),
            Scope::Address(address) => address.0.to_vec(),
            Scope::Token { code_hash, genesis } => token_member(code_hash, genesis),
            Scope::TokenOwner { code_hash, genesis, address } => {
                let mut out = token_member(code_hash, genesis);
                out.extend_from_slice(&address.0);
                out
            }
            Scope::Nft { code_hash, nft_id } => {
                let mut out = Vec::with_capacity(HASH160_LEN * 2);
                out.extend_from_slice(&code_hash.0);
                out.extend_from_slice(&nft_id.0);
                out
            }
        }
    }
}

/// Member encoding used by per-address token indexes: `codeHash ‖ genesis`.
pub fn token_member(code_hash: &Hash160, genesis: &Hash160) -> Vec<u8> {
    let mut out = Vec::with_capacity(HASH160_LEN * 2);
    out.extend_from_slice(&code_hash.0);
    out.extend_from_slice(&genesis.0);
    out
}

pub fn split_token_member(member: &[u8]) -> Option<(Hash160, Hash160)> {
    if member.len() != HASH160_LEN * 2 {
        return None;
    }
    Some((
        Hash160::from_slice(&member[..HASH160_LEN])?,
        Hash160::from_slice(&member[HASH160_LEN..])?,
    ))
}

/// Record-store key of a token's display metadata.
pub fn token_info_key(code_hash: &Hash160, genesis: &Hash160) -> Vec<u8> {
    let mut key = vec![b'i'];
    key.extend_from_slice(&token_member(code_hash, genesis));
    key
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Confirmed,
    PendingAdd,
    PendingRemove,
    /// Aggregate value per member, score is the value.
    Balance,
    /// Pending portion of `Balance`, same members.
    BalanceDelta,
    /// Confirmed entries scored by token index for exact-match lookups.
    Indexed,
    PendingIndexed,
}

impl Role {
    pub fn tag(self) -> u8 {
        match self {
            Role::Confirmed => b'c',
            Role::PendingAdd => b'a',
            Role::PendingRemove => b'r',
            Role::Balance => b'b',
            Role::BalanceDelta => b'd',
            Role::Indexed => b'x',
            Role::PendingIndexed => b'y',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchSlot {
    TopK,
    Diff,
    Union,
}

impl ScratchSlot {
    fn tag(self) -> u8 {
        match self {
            ScratchSlot::TopK => b't',
            ScratchSlot::Diff => b'f',
            ScratchSlot::Union => b'u',
        }
    }
}

const VIEW_ROLES: &[Role] = &[Role::Confirmed, Role::PendingAdd, Role::PendingRemove];
const INDEXED_VIEW_ROLES: &[Role] = &[
    Role::Confirmed,
    Role::PendingAdd,
    Role::PendingRemove,
    Role::Indexed,
    Role::PendingIndexed,
];
const AGGREGATE_ROLES: &[Role] = &[Role::Balance, Role::BalanceDelta];

/// Strategy object deriving collection names for one scope family.
pub trait ScopeKeyScheme: Send + Sync {
    fn name(&self) -> &'static str;
    fn tag(&self) -> u8;
    fn shape(&self) -> ScopeShape;
    fn roles(&self) -> &'static [Role];

    fn key(&self, scope: &Scope, role: Role) -> Result<Vec<u8>> {
        self.check(scope)?;
        if !self.roles().contains(&role) {
            return Err(QueryError::invalid(format!(
                "{} has no {:?} collection",
                self.name(),
                role
            )));
        }
        let ids = scope.id_bytes();
        let mut key = Vec::with_capacity(2 + ids.len());
        key.push(self.tag());
        key.push(role.tag());
        key.extend_from_slice(&ids);
        Ok(key)
    }

    /// Scratch names carry a per-request nonce so concurrent requests on the
    /// same scope never share a scratch collection.
    fn scratch_key(&self, scope: &Scope, slot: ScratchSlot, nonce: u64) -> Result<Vec<u8>> {
        self.check(scope)?;
        let ids = scope.id_bytes();
        let mut key = Vec::with_capacity(3 + ids.len() + 8);
        key.push(SCRATCH_TAG);
        key.push(self.tag());
        key.push(slot.tag());
        key.extend_from_slice(&ids);
        key.extend_from_slice(&nonce.to_be_bytes());
        Ok(key)
    }

    fn check(&self, scope: &Scope) -> Result<()> {
        if scope.shape() != self.shape() {
            return Err(QueryError::invalid(format!(
                "{} expects a {:?} scope, got {:?}",
                self.name(),
                self.shape(),
                scope.shape()
            )));
        }
        Ok(())
    }
}

/// The scope families served by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Plain UTXOs of an address.
    AddressUtxo,
    /// FT UTXOs of an address for one token.
    FtUtxo,
    /// NFT UTXOs of an address for one token.
    NftUtxo,
    /// Every NFT UTXO of a token, indexed by token index.
    NftToken,
    /// The UTXO currently holding one NFT.
    NftById,
    /// Marketplace listings of a token.
    SellByToken,
    /// Marketplace listings created by an address.
    SellByAddress,
    /// Chain-wide plain balances, member = address.
    PlainBalance,
    /// FT holder balances of a token, member = address.
    FtHolders,
    /// FT balances of an address, member = codeHash ‖ genesis.
    FtSummary,
    /// NFT counts per holder of a token, member = address.
    NftHolders,
    /// NFT counts of an address, member = codeHash ‖ genesis.
    NftSummary,
}

impl ScopeKeyScheme for Family {
    fn name(&self) -> &'static str {
        match self {
            Family::AddressUtxo => "address_utxo",
            Family::FtUtxo => "ft_utxo",
            Family::NftUtxo => "nft_utxo",
            Family::NftToken => "nft_token",
            Family::NftById => "nft_by_id",
            Family::SellByToken => "sell_by_token",
            Family::SellByAddress => "sell_by_address",
            Family::PlainBalance => "plain_balance",
            Family::FtHolders => "ft_holders",
            Family::FtSummary => "ft_summary",
            Family::NftHolders => "nft_holders",
            Family::NftSummary => "nft_summary",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Family::AddressUtxo => b'u',
            Family::FtUtxo => b'f',
            Family::NftUtxo => b'n',
            Family::NftToken => b'N',
            Family::NftById => b'I',
            Family::SellByToken => b's',
            Family::SellByAddress => b'S',
            Family::PlainBalance => b'b',
            Family::FtHolders => b'h',
            Family::FtSummary => b'F',
            Family::NftHolders => b'H',
            Family::NftSummary => b'M',
        }
    }

    fn shape(&self) -> ScopeShape {
        match self {
            Family::AddressUtxo | Family::SellByAddress | Family::FtSummary | Family::NftSummary => {
                ScopeShape::Address
            }
            Family::FtUtxo | Family::NftUtxo => ScopeShape::TokenOwner,
            Family::NftToken | Family::SellByToken | Family::FtHolders | Family::NftHolders => {
                ScopeShape::Token
            }
            Family::NftById => ScopeShape::Nft,
            Family::PlainBalance => ScopeShape::All,
        }
    }

    fn roles(&self) -> &'static [Role] {
        match self {
            Family::NftToken | Family::SellByToken => INDEXED_VIEW_ROLES,
            Family::AddressUtxo
            | Family::FtUtxo
            | Family::NftUtxo
            | Family::NftById
            | Family::SellByAddress => VIEW_ROLES,
            Family::PlainBalance
            | Family::FtHolders
            | Family::FtSummary
            | Family::NftHolders
            | Family::NftSummary => AGGREGATE_ROLES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_FAMILIES: &[Family] = &[
        Family::AddressUtxo,
        Family::FtUtxo,
        Family::NftUtxo,
        Family::NftToken,
        Family::NftById,
        Family::SellByToken,
        Family::SellByAddress,
        Family::PlainBalance,
        Family::FtHolders,
        Family::FtSummary,
        Family::NftHolders,
        Family::NftSummary,
    ];

    fn sample_scope(shape: ScopeShape, seed: u8) -> Scope {
        let h = |n: u8| Hash160([seed.wrapping_add(n); 20]);
        match shape {
            ScopeShape::All => Scope::All,
            ScopeShape::Address => Scope::Address(h(0)),
            ScopeShape::Token => Scope::Token { code_hash: h(0), genesis: h(1) },
            ScopeShape::TokenOwner => Scope::TokenOwner { code_hash: h(0), genesis: h(1), address: h(2) },
            ScopeShape::Nft => Scope::Nft { code_hash: h(0), nft_id: h(1) },
        }
    }

    #[test]
    fn test_key_layout_is_raw_bytes() {
        let addr = Hash160([0xaa; 20]);
        let key = Family::AddressUtxo.key(&Scope::Address(addr), Role::PendingAdd).unwrap();
        assert_eq!(key.len(), 22);
        assert_eq!(&key[..2], b"ua");
        assert_eq!(&key[2..], &[0xaa; 20]);
    }

    #[test]
    fn test_keys_are_collision_free_across_families() {
        let mut seen = HashSet::new();
        for family in ALL_FAMILIES {
            for seed in [1u8, 2, 3] {
                let scope = sample_scope(family.shape(), seed);
                for role in family.roles() {
                    let key = family.key(&scope, *role).unwrap();
                    assert!(seen.insert(key), "duplicate key for {:?}/{:?}", family, role);
                }
            }
        }
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let scope = Scope::Address(Hash160([1; 20]));
        assert!(matches!(
            Family::FtUtxo.key(&scope, Role::Confirmed),
            Err(QueryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_role_not_carried_rejected() {
        let scope = Scope::Address(Hash160([1; 20]));
        assert!(Family::AddressUtxo.key(&scope, Role::Balance).is_err());
        assert!(Family::FtSummary.key(&scope, Role::Confirmed).is_err());
    }

    #[test]
    fn test_scratch_keys_differ_per_nonce_and_slot() {
        let scope = Scope::Token { code_hash: Hash160([1; 20]), genesis: Hash160([2; 20]) };
        let a = Family::SellByToken.scratch_key(&scope, ScratchSlot::TopK, 1).unwrap();
        let b = Family::SellByToken.scratch_key(&scope, ScratchSlot::TopK, 2).unwrap();
        let c = Family::SellByToken.scratch_key(&scope, ScratchSlot::Diff, 1).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a[0], SCRATCH_TAG);
    }

    #[test]
    fn test_token_member_split() {
        let code = Hash160([3; 20]);
        let genesis = Hash160([4; 20]);
        let member = token_member(&code, &genesis);
        assert_eq!(split_token_member(&member), Some((code, genesis)));
        assert_eq!(split_token_member(&member[1..]), None);
    }
}
