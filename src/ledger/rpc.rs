use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::account::Account;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use solana_system_interface::instruction as system_instruction;
use spl_token::solana_program::program_pack::{IsInitialized, Pack};
use spl_token::state::{Account as TokenAccount, Mint};
use tracing::{debug, info};

use super::ata::{associated_token_address, create_idempotent_instruction};
use super::{LedgerClient, LedgerError, LedgerResult, MintInfo};

/// 水龙头交易确认轮询参数。
#[derive(Debug, Clone)]
pub struct RpcLedgerSettings {
    pub confirm_poll_interval: Duration,
    pub confirm_max_attempts: u32,
}

/// 基于 Solana RPC 节点的账本实现，所有查询与确认都使用客户端自带的 commitment。
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    settings: RpcLedgerSettings,
}

impl RpcLedger {
    pub fn new(client: Arc<RpcClient>, settings: RpcLedgerSettings) -> Self {
        Self { client, settings }
    }

    pub fn endpoint(&self) -> String {
        self.client.url()
    }

    async fn fetch_account(&self, address: &Pubkey) -> LedgerResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?;
        Ok(response.value)
    }

    async fn fetch_token_account(&self, address: &Pubkey) -> LedgerResult<TokenAccount> {
        let account = self
            .fetch_account(address)
            .await?
            .ok_or(LedgerError::AccountNotFound(*address))?;
        unpack_token_program_state::<TokenAccount>(address, &account)
    }

    async fn send_transaction(
        &self,
        payer: &Keypair,
        instructions: &[Instruction],
        extra_signers: &[&Keypair],
    ) -> LedgerResult<Signature> {
        let blockhash = self.client.get_latest_blockhash().await?;
        // `dyn Signer` 不是 Sync，签名者列表不能跨越 await 存活
        let (tx, signer_count) = {
            let signers = collect_signers(payer, extra_signers);
            let tx = Transaction::new_signed_with_payer(
                instructions,
                Some(&payer.pubkey()),
                &signers,
                blockhash,
            );
            (tx, signers.len())
        };
        let signature = self.client.send_and_confirm_transaction(&tx).await?;
        debug!(
            target: "ledger::rpc",
            %signature,
            instructions = instructions.len(),
            signers = signer_count,
            "交易已确认"
        );
        Ok(signature)
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn fund_account(&self, address: &Pubkey, lamports: u64) -> LedgerResult<Signature> {
        let signature = self
            .client
            .request_airdrop(address, lamports)
            .await
            .map_err(|err| LedgerError::Faucet(err.to_string()))?;
        info!(
            target: "ledger::rpc",
            %address,
            lamports,
            %signature,
            "已提交水龙头请求，等待确认"
        );

        let commitment = self.client.commitment();
        let max_attempts = self.settings.confirm_max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let status = self
                .client
                .get_signature_statuses(&[signature])
                .await?
                .value
                .into_iter()
                .next()
                .flatten()
                .filter(|status| status.satisfies_commitment(commitment));
            if let Some(status) = status {
                return match status.err {
                    Some(err) => Err(LedgerError::Faucet(format!(
                        "空投交易 {signature} 执行失败: {err}"
                    ))),
                    None => Ok(signature),
                };
            }
            debug!(target: "ledger::rpc", %signature, attempt, "水龙头交易尚未确认");
            if attempt < max_attempts {
                tokio::time::sleep(self.settings.confirm_poll_interval).await;
            }
        }

        Err(LedgerError::ConfirmationTimeout {
            signature,
            attempts: max_attempts,
        })
    }

    async fn create_token_type(
        &self,
        payer: &Keypair,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
        decimals: u8,
    ) -> LedgerResult<Pubkey> {
        let mint = Keypair::new();
        let rent = self
            .client
            .get_minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;

        let instructions = [
            system_instruction::create_account(
                &payer.pubkey(),
                &mint.pubkey(),
                rent,
                Mint::LEN as u64,
                &spl_token::ID,
            ),
            spl_token::instruction::initialize_mint2(
                &spl_token::ID,
                &mint.pubkey(),
                mint_authority,
                freeze_authority,
                decimals,
            )
            .map_err(|err| LedgerError::InvalidInstruction(err.to_string()))?,
        ];

        let signature = self.send_transaction(payer, &instructions, &[&mint]).await?;
        info!(
            target: "ledger::rpc",
            mint = %mint.pubkey(),
            decimals,
            rent,
            %signature,
            "Mint 已创建"
        );
        Ok(mint.pubkey())
    }

    async fn ensure_token_account(
        &self,
        payer: &Keypair,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> LedgerResult<Pubkey> {
        let address = associated_token_address(owner, mint);
        if let Some(account) = self.fetch_account(&address).await? {
            let state = unpack_token_program_state::<TokenAccount>(&address, &account)?;
            ensure_associated_state(&address, &state, mint, owner)?;
            debug!(target: "ledger::rpc", %address, "关联账户已存在");
            return Ok(address);
        }

        let instruction = create_idempotent_instruction(&payer.pubkey(), owner, mint);
        let signature = self.send_transaction(payer, &[instruction], &[]).await?;
        info!(
            target: "ledger::rpc",
            %address,
            %owner,
            %mint,
            %signature,
            "关联账户已创建"
        );
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
        let instruction = spl_token::instruction::mint_to(
            &spl_token::ID,
            mint,
            account,
            &authority.pubkey(),
            &[],
            amount,
        )
        .map_err(|err| LedgerError::InvalidInstruction(err.to_string()))?;
        self.send_transaction(payer, &[instruction], &[authority]).await
    }

    async fn move_tokens(
        &self,
        payer: &Keypair,
        source: &Pubkey,
        destination: &Pubkey,
        owner: &Keypair,
        amount: u64,
    ) -> LedgerResult<Signature> {
        let instruction = spl_token::instruction::transfer(
            &spl_token::ID,
            source,
            destination,
            &owner.pubkey(),
            &[],
            amount,
        )
        .map_err(|err| LedgerError::InvalidInstruction(err.to_string()))?;
        self.send_transaction(payer, &[instruction], &[owner]).await
    }

    async fn read_balance(&self, account: &Pubkey) -> LedgerResult<u64> {
        Ok(self.fetch_token_account(account).await?.amount)
    }

    async fn native_balance(&self, address: &Pubkey) -> LedgerResult<u64> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn mint_info(&self, mint: &Pubkey) -> LedgerResult<MintInfo> {
        let account = self
            .fetch_account(mint)
            .await?
            .ok_or(LedgerError::AccountNotFound(*mint))?;
        let state = unpack_token_program_state::<Mint>(mint, &account)?;
        Ok(MintInfo {
            decimals: state.decimals,
            supply: state.supply,
            mint_authority: Option::from(state.mint_authority),
            freeze_authority: Option::from(state.freeze_authority),
        })
    }
}

/// 手续费支付者排在首位，按公钥去重。
fn collect_signers<'a>(
    payer: &'a Keypair,
    extra_signers: &[&'a Keypair],
) -> Vec<&'a dyn Signer> {
    let mut signers: Vec<&dyn Signer> = Vec::with_capacity(1 + extra_signers.len());
    signers.push(payer);
    for signer in extra_signers {
        let pubkey = signer.pubkey();
        if signers.iter().all(|existing| existing.pubkey() != pubkey) {
            signers.push(*signer);
        }
    }
    signers
}

fn unpack_token_program_state<T>(address: &Pubkey, account: &Account) -> LedgerResult<T>
where
    T: Pack + IsInitialized,
{
    if account.owner != spl_token::ID {
        return Err(LedgerError::invalid_data(
            address,
            format!("账户不属于 SPL Token Program（owner {}）", account.owner),
        ));
    }
    T::unpack(&account.data).map_err(|err| LedgerError::invalid_data(address, err))
}

fn ensure_associated_state(
    address: &Pubkey,
    state: &TokenAccount,
    mint: &Pubkey,
    owner: &Pubkey,
) -> LedgerResult<()> {
    if state.mint != *mint {
        return Err(LedgerError::MintMismatch {
            account: *address,
            expected: *mint,
            actual: state.mint,
        });
    }
    if state.owner != *owner {
        return Err(LedgerError::invalid_data(
            address,
            format!("关联账户所有者为 {}，预期 {owner}", state.owner),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::{Value, json};
    use solana_client::rpc_request::RpcRequest;
    use spl_token::solana_program::program_option::COption;
    use spl_token::state::AccountState;

    fn mock_ledger(url: &str, confirm_max_attempts: u32) -> RpcLedger {
        ledger_with_client(RpcClient::new_mock(url.to_string()), confirm_max_attempts)
    }

    fn ledger_with_account(account: &Account) -> RpcLedger {
        let mut mocks = HashMap::new();
        mocks.insert(RpcRequest::GetAccountInfo, account_response(account));
        ledger_with_client(
            RpcClient::new_mock_with_mocks("succeeds".to_string(), mocks),
            3,
        )
    }

    fn ledger_with_client(client: RpcClient, confirm_max_attempts: u32) -> RpcLedger {
        RpcLedger::new(
            Arc::new(client),
            RpcLedgerSettings {
                confirm_poll_interval: Duration::from_millis(1),
                confirm_max_attempts,
            },
        )
    }

    fn account_response(account: &Account) -> Value {
        json!({
            "context": { "slot": 1 },
            "value": {
                "lamports": account.lamports,
                "data": [STANDARD.encode(&account.data), "base64"],
                "owner": account.owner.to_string(),
                "executable": account.executable,
                "rentEpoch": account.rent_epoch,
                "space": account.data.len(),
            }
        })
    }

    fn packed_mint(authority: Pubkey, decimals: u8, supply: u64) -> Account {
        let state = Mint {
            mint_authority: COption::Some(authority),
            supply,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; Mint::LEN];
        Mint::pack(state, &mut data).expect("pack mint");
        Account {
            lamports: 1_461_600,
            data,
            owner: spl_token::ID,
            executable: false,
            rent_epoch: 0,
        }
    }

    #[tokio::test]
    async fn airdrop_confirms_on_first_poll() {
        let ledger = mock_ledger("succeeds", 3);
        let wallet = Pubkey::new_unique();
        ledger
            .fund_account(&wallet, 1_000_000_000)
            .await
            .expect("airdrop confirmed");
    }

    #[tokio::test]
    async fn zero_attempt_budget_still_polls_once() {
        let ledger = mock_ledger("succeeds", 0);
        let wallet = Pubkey::new_unique();
        assert!(ledger.fund_account(&wallet, 1_000).await.is_ok());
    }

    #[tokio::test]
    async fn unseen_airdrop_times_out_after_budget() {
        let ledger = mock_ledger("sig_not_found", 2);
        let wallet = Pubkey::new_unique();
        match ledger.fund_account(&wallet, 1_000).await {
            Err(LedgerError::ConfirmationTimeout { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_airdrop_transaction_is_reported_as_faucet_error() {
        let ledger = mock_ledger("instruction_error", 5);
        let wallet = Pubkey::new_unique();
        assert!(matches!(
            ledger.fund_account(&wallet, 1_000).await,
            Err(LedgerError::Faucet(_))
        ));
    }

    #[tokio::test]
    async fn rejected_airdrop_request_maps_to_faucet_error() {
        let ledger = mock_ledger("fails", 3);
        let wallet = Pubkey::new_unique();
        assert!(matches!(
            ledger.fund_account(&wallet, 1_000).await,
            Err(LedgerError::Faucet(_))
        ));
    }

    #[tokio::test]
    async fn reads_token_balance_from_account_data() {
        let address = Pubkey::new_unique();
        let account = packed_token_account(Pubkey::new_unique(), Pubkey::new_unique(), 900);
        let ledger = ledger_with_account(&account);
        assert_eq!(ledger.read_balance(&address).await.unwrap(), 900);
    }

    #[tokio::test]
    async fn reads_mint_info_from_account_data() {
        let mint = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let ledger = ledger_with_account(&packed_mint(authority, 6, 1_000));
        let info = ledger.mint_info(&mint).await.expect("mint info");
        assert_eq!(
            info,
            MintInfo {
                decimals: 6,
                supply: 1_000,
                mint_authority: Some(authority),
                freeze_authority: None,
            }
        );
    }

    #[tokio::test]
    async fn existing_associated_account_is_reused() {
        let payer = Keypair::new();
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ledger = ledger_with_account(&packed_token_account(mint, owner, 0));

        let address = ledger
            .ensure_token_account(&payer, &mint, &owner)
            .await
            .expect("existing account");
        assert_eq!(address, associated_token_address(&owner, &mint));
    }

    #[tokio::test]
    async fn existing_account_for_other_mint_is_rejected() {
        let payer = Keypair::new();
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ledger = ledger_with_account(&packed_token_account(Pubkey::new_unique(), owner, 0));

        assert!(matches!(
            ledger.ensure_token_account(&payer, &mint, &owner).await,
            Err(LedgerError::MintMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn mint_creation_signs_with_payer_and_mint() {
        let ledger = mock_ledger("succeeds", 1);
        let payer = Keypair::new();
        let authority = Pubkey::new_unique();
        let mint = ledger
            .create_token_type(&payer, &authority, None, 9)
            .await
            .expect("mint created");
        assert_ne!(mint, payer.pubkey());
    }

    #[tokio::test]
    async fn native_balance_comes_from_node() {
        let ledger = mock_ledger("succeeds", 1);
        assert_eq!(
            ledger.native_balance(&Pubkey::new_unique()).await.unwrap(),
            50
        );
    }

    #[test]
    fn signers_dedupe_payer() {
        let payer = Keypair::new();
        let authority = Keypair::new();
        let signers = collect_signers(&payer, &[&payer, &authority, &authority]);
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0].pubkey(), payer.pubkey());
        assert_eq!(signers[1].pubkey(), authority.pubkey());
    }

    fn packed_token_account(mint: Pubkey, owner: Pubkey, amount: u64) -> Account {
        let state = TokenAccount {
            mint,
            owner,
            amount,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(state, &mut data).expect("pack token account");
        Account {
            lamports: 2_039_280,
            data,
            owner: spl_token::ID,
            executable: false,
            rent_epoch: 0,
        }
    }

    #[test]
    fn unpacks_token_account_owned_by_token_program() {
        let address = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let account = packed_token_account(mint, owner, 42);

        let state = unpack_token_program_state::<TokenAccount>(&address, &account)
            .expect("unpack token account");
        assert_eq!(state.amount, 42);
        assert!(ensure_associated_state(&address, &state, &mint, &owner).is_ok());
        assert!(matches!(
            ensure_associated_state(&address, &state, &Pubkey::new_unique(), &owner),
            Err(LedgerError::MintMismatch { .. })
        ));
        assert!(matches!(
            ensure_associated_state(&address, &state, &mint, &Pubkey::new_unique()),
            Err(LedgerError::InvalidAccountData { .. })
        ));
    }

    #[test]
    fn rejects_foreign_program_owner() {
        let address = Pubkey::new_unique();
        let mut account = packed_token_account(Pubkey::new_unique(), Pubkey::new_unique(), 1);
        account.owner = Pubkey::new_unique();
        assert!(matches!(
            unpack_token_program_state::<TokenAccount>(&address, &account),
            Err(LedgerError::InvalidAccountData { .. })
        ));
    }
}
