use dashmap::DashMap;
use once_cell::sync::Lazy;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_system_interface::program as system_program;

const TOKEN_PROGRAM: Pubkey = spl_token::ID;
const ASSOCIATED_TOKEN_PROGRAM: Pubkey = spl_associated_token_account::ID;

/// Associated Token Program 的 `CreateIdempotent` 指令判别字节。
const CREATE_IDEMPOTENT_TAG: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OwnerMint {
    owner: Pubkey,
    mint: Pubkey,
}

static ADDRESS_CACHE: Lazy<DashMap<OwnerMint, Pubkey>> = Lazy::new(DashMap::new);

/// 返回 (owner, mint) 对应的 SPL Token 关联账户地址，首次计算后缓存。
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let key = OwnerMint {
        owner: *owner,
        mint: *mint,
    };
    *ADDRESS_CACHE
        .entry(key)
        .or_insert_with(|| derive_address(owner, mint))
}

fn derive_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let seeds: [&[u8]; 3] = [owner.as_ref(), TOKEN_PROGRAM.as_ref(), mint.as_ref()];
    Pubkey::find_program_address(&seeds, &ASSOCIATED_TOKEN_PROGRAM).0
}

/// 幂等创建关联账户：账户已存在时链上直接成功返回。
pub fn create_idempotent_instruction(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    let associated = associated_token_address(owner, mint);
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(associated, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),
        ],
        data: vec![CREATE_IDEMPOTENT_TAG],
    }
}
