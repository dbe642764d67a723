use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::debug;

use super::ata::associated_token_address;
use super::{LedgerClient, LedgerError, LedgerResult, MintInfo};

/// 与主网一致的单签名基础手续费。
pub const DEFAULT_SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

#[derive(Debug, Clone, Copy)]
struct TokenAccountState {
    mint: Pubkey,
    owner: Pubkey,
    amount: u64,
}

#[derive(Default)]
struct LedgerState {
    lamports: HashMap<Pubkey, u64>,
    mints: HashMap<Pubkey, MintInfo>,
    token_accounts: HashMap<Pubkey, TokenAccountState>,
    faucet_remaining: Option<u64>,
    sequence: u64,
}

impl LedgerState {
    fn lamports_of(&self, address: &Pubkey) -> u64 {
        self.lamports.get(address).copied().unwrap_or(0)
    }

    fn token_account(&self, address: &Pubkey) -> LedgerResult<TokenAccountState> {
        self.token_accounts
            .get(address)
            .copied()
            .ok_or(LedgerError::AccountNotFound(*address))
    }

    /// 校验手续费支付者余额，通过后才允许交易落账。
    fn fee_check(&self, payer: &Pubkey, fee: u64) -> LedgerResult<()> {
        let available = self.lamports_of(payer);
        if available < fee {
            return Err(LedgerError::InsufficientLamports {
                address: *payer,
                available,
                required: fee,
            });
        }
        Ok(())
    }

    fn charge(&mut self, payer: &Pubkey, fee: u64) {
        if let Some(balance) = self.lamports.get_mut(payer) {
            *balance -= fee;
        }
    }
}

/// 进程内模拟账本：按 SPL Token Program 的规则校验权限、余额与 Mint 一致性，
/// 每笔交易按签名数向支付者收取手续费。用于 dry-run 与测试。
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    validator: Keypair,
    signature_fee: u64,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            validator: Keypair::new(),
            signature_fee: DEFAULT_SIGNATURE_FEE_LAMPORTS,
        }
    }

    /// 限制水龙头可发放的 lamports 总量，耗尽后请求失败（模拟限流）。
    pub fn with_faucet_budget(self, lamports: u64) -> Self {
        self.state.lock().faucet_remaining = Some(lamports);
        self
    }

    pub fn with_signature_fee(mut self, lamports: u64) -> Self {
        self.signature_fee = lamports;
        self
    }

    fn fee_for(&self, signers: &[&Pubkey]) -> u64 {
        let mut unique: Vec<&Pubkey> = Vec::with_capacity(signers.len());
        for signer in signers {
            if !unique.contains(signer) {
                unique.push(*signer);
            }
        }
        self.signature_fee * unique.len() as u64
    }

    /// 账本中恰好存在一个 Mint 时返回其地址。
    #[cfg(test)]
    pub(crate) fn only_mint(&self) -> Option<Pubkey> {
        let state = self.state.lock();
        let mut mints = state.mints.keys();
        match (mints.next(), mints.next()) {
            (Some(mint), None) => Some(*mint),
            _ => None,
        }
    }

    fn seal(&self, state: &mut LedgerState, kind: &str) -> Signature {
        state.sequence += 1;
        let message = format!("{kind}:{}", state.sequence);
        self.validator.sign_message(message.as_bytes())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn fund_account(&self, address: &Pubkey, lamports: u64) -> LedgerResult<Signature> {
        let mut state = self.state.lock();
        let balance = state
            .lamports_of(address)
            .checked_add(lamports)
            .ok_or(LedgerError::Overflow("lamports"))?;
        if let Some(remaining) = state.faucet_remaining {
            if remaining < lamports {
                return Err(LedgerError::Faucet(format!(
                    "水龙头额度不足: 剩余 {remaining} lamports，请求 {lamports}"
                )));
            }
            state.faucet_remaining = Some(remaining - lamports);
        }
        state.lamports.insert(*address, balance);
        debug!(target: "ledger::memory", %address, lamports, "水龙头已发放");
        Ok(self.seal(&mut state, "airdrop"))
    }

    async fn create_token_type(
        &self,
        payer: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> LedgerResult<Pubkey> {
        let mint = Keypair::new().pubkey();
        let payer_key = payer.pubkey();
        let fee = self.fee_for(&[&payer_key, &mint]);

        let mut state = self.state.lock();
        state.fee_check(&payer_key, fee)?;
        state.charge(&payer_key, fee);
        state.mints.insert(
            mint,
            MintInfo {
                decimals,
                supply: 0,
                mint_authority: Some(*mint_authority),
                freeze_authority: freeze_authority.copied(),
            },
        );
        let signature = self.seal(&mut state, "create_mint");
        debug!(target: "ledger::memory", %mint, decimals, %signature, "Mint 已创建");
        Ok(mint)
    }

    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> LedgerResult<Pubkey> {
        let address = associated_token_address(owner, mint);
        let payer_key = payer.pubkey();

        let mut state = self.state.lock();
        if !state.mints.contains_key(mint) {
            return Err(LedgerError::AccountNotFound(*mint));
        }
        if let Some(existing) = state.token_accounts.get(&address) {
            if existing.mint != *mint {
                return Err(LedgerError::MintMismatch {
                    account: address,
                    expected: *mint,
                    actual: existing.mint,
                });
            }
            if existing.owner != *owner {
                return Err(LedgerError::invalid_data(
                    &address,
                    format!("关联账户所有者为 {}，预期 {owner}", existing.owner),
                ));
            }
            return Ok(address);
        }

        let fee = self.fee_for(&[&payer_key]);
        state.fee_check(&payer_key, fee)?;
        state.charge(&payer_key, fee);
        state.token_accounts.insert(
            address,
            TokenAccountState {
                mint: *mint,
                owner: *owner,
                amount: 0,
            },
        );
        let signature = self.seal(&mut state, "create_ata");
        debug!(target: "ledger::memory", %address, %owner, %signature, "关联账户已创建");
        Ok(address)
    }

    async fn issue_supply(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        account: &Pubkey,
        authority: &Keypair,
        amount: u64,
    ) -> LedgerResult<Signature> {
        let payer_key = payer.pubkey();
        let authority_key = authority.pubkey();
        let fee = self.fee_for(&[&payer_key, &authority_key]);

        let mut state = self.state.lock();
        let mint_info = state
            .mints
            .get(mint)
            .copied()
            .ok_or(LedgerError::AccountNotFound(*mint))?;
        let target = state.token_account(account)?;
        if target.mint != *mint {
            return Err(LedgerError::MintMismatch {
                account: *account,
                expected: *mint,
                actual: target.mint,
            });
        }
        if mint_info.mint_authority != Some(authority_key) {
            return Err(LedgerError::Unauthorized {
                account: *mint,
                signer: authority_key,
            });
        }
        let supply = mint_info
            .supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("mint supply"))?;
        let balance = target
            .amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow("token balance"))?;
        state.fee_check(&payer_key, fee)?;

        state.charge(&payer_key, fee);
        if let Some(info) = state.mints.get_mut(mint) {
            info.supply = supply;
        }
        if let Some(target) = state.token_accounts.get_mut(account) {
            target.amount = balance;
        }
        Ok(self.seal(&mut state, "mint_to"))
    }

    async fn move_tokens(
        &self,
        payer: &Keypair,
        source: &Pubkey,
        destination: &Pubkey,
        owner: &Keypair,
        amount: u64,
    ) -> LedgerResult<Signature> {
        let payer_key = payer.pubkey();
        let owner_key = owner.pubkey();
        let fee = self.fee_for(&[&payer_key, &owner_key]);

        let mut state = self.state.lock();
        let from = state.token_account(source)?;
        let to = state.token_account(destination)?;
        if from.mint != to.mint {
            return Err(LedgerError::MintMismatch {
                account: *destination,
                expected: from.mint,
                actual: to.mint,
            });
        }
        if from.owner != owner_key {
            return Err(LedgerError::Unauthorized {
                account: *source,
                signer: owner_key,
            });
        }
        if from.amount < amount {
            return Err(LedgerError::InsufficientFunds {
                account: *source,
                available: from.amount,
                requested: amount,
            });
        }
        if source != destination {
            to.amount
                .checked_add(amount)
                .ok_or(LedgerError::Overflow("token balance"))?;
        }
        state.fee_check(&payer_key, fee)?;

        state.charge(&payer_key, fee);
        if let Some(from) = state.token_accounts.get_mut(source) {
            from.amount -= amount;
        }
        if let Some(to) = state.token_accounts.get_mut(destination) {
            to.amount += amount;
        }
        Ok(self.seal(&mut state, "transfer"))
    }

    async fn read_balance(&self, account: &Pubkey) -> LedgerResult<u64> {
        Ok(self.state.lock().token_account(account)?.amount)
    }

    async fn native_balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        Ok(self.state.lock().lamports_of(address))
    }

    async fn mint_info(&self, mint: &Pubkey) -> LedgerResult<MintInfo> {
        self.state
            .lock()
            .mints
            .get(mint)
            .copied()
            .ok_or(LedgerError::AccountNotFound(*mint))
    }
}
