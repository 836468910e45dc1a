//! Donation ledger state machine
//!
//! ```text
//! Uninitialized(authority) --initialize--> Bank(authority, balance)
//! Bank --make_donation(amount)--> Bank(balance + amount), Registry(amount += amount)
//! Bank --withdraw--> Bank(floor), destination += surplus
//! ```
//!
//! Each handler validates every supplied address against its seed
//! derivation before touching state, so callers cannot redirect an
//! operation by naming a different account. Failures are returned as-is;
//! the runtime discards whatever the handler staged before failing.

use crate::context::InvokeContext;
use crate::event::{DonationEvent, LedgerEvent, WithdrawEvent};
use crate::instruction::LedgerInstruction;
use crate::pda;
use crate::state::{Bank, LedgerAccount, Registry};
use crate::types::{Pubkey, SYSTEM_PROGRAM_ID};
use crate::{Error, Result};
use tracing::{debug, info};

/// Entry point for every instruction addressed to the ledger program
pub fn process_instruction(ctx: &mut InvokeContext<'_, '_>, data: &[u8]) -> Result<()> {
    let instruction = LedgerInstruction::unpack(data)?;
    debug!(instruction = instruction.name(), "processing ledger instruction");

    match instruction {
        LedgerInstruction::Initialize { authority } => initialize(ctx, authority),
        LedgerInstruction::MakeDonation { amount } => make_donation(ctx, amount),
        LedgerInstruction::Withdraw => withdraw(ctx),
    }
}

/// Create the bank controlled by `authority`, funded by the payer.
pub fn initialize(ctx: &mut InvokeContext<'_, '_>, authority: Pubkey) -> Result<()> {
    ctx.require_accounts(3)?;
    let bank = ctx.key(0)?;
    let payer = ctx.key(1)?;
    check_system_program(ctx.key(2)?)?;

    ctx.require_signer(&payer)?;

    let (expected, bump) = pda::try_find_program_address(&[authority.as_ref()], ctx.program_id())?;
    if bank != expected {
        return Err(Error::SeedsConstraint {
            expected,
            actual: bank,
        });
    }

    ctx.create_pda_account(&payer, &bank, &[authority.as_ref(), &[bump]], Bank::LEN)?;
    ctx.set_data(&bank, Bank { authority }.try_serialize()?)?;

    info!(%bank, %authority, %payer, "donation bank initialized");
    Ok(())
}

/// Transfer `amount` from the donor into the bank and record it.
///
/// The donor's registry is created on first contribution (the donor pays its
/// floor) and incremented on every later one.
pub fn make_donation(ctx: &mut InvokeContext<'_, '_>, amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(Error::InvalidAmount);
    }

    ctx.require_accounts(4)?;
    let bank = ctx.key(0)?;
    let registry_key = ctx.key(1)?;
    let donor = ctx.key(2)?;
    check_system_program(ctx.key(3)?)?;

    ctx.require_signer(&donor)?;
    load_bank(ctx, &bank)?;

    let (expected, bump) =
        pda::try_find_program_address(&[bank.as_ref(), donor.as_ref()], ctx.program_id())?;
    if registry_key != expected {
        return Err(Error::SeedsConstraint {
            expected,
            actual: registry_key,
        });
    }

    ctx.system_transfer(&donor, &bank, amount)?;

    let registry = match existing_registry(ctx, &registry_key)? {
        Some(mut registry) => {
            registry.amount = registry
                .amount
                .checked_add(amount)
                .ok_or(Error::CalculationFailure)?;
            registry
        }
        None => {
            ctx.create_pda_account(
                &donor,
                &registry_key,
                &[bank.as_ref(), donor.as_ref(), &[bump]],
                Registry::LEN,
            )?;
            debug!(registry = %registry_key, %donor, "registry created");
            Registry {
                bank,
                donor,
                amount,
            }
        }
    };
    ctx.set_data(&registry_key, registry.try_serialize()?)?;

    ctx.emit(LedgerEvent::Donation(DonationEvent {
        bank,
        donor,
        amount,
    }));

    info!(%bank, %donor, amount, total = registry.amount, "donation recorded");
    Ok(())
}

/// Move everything above the bank's persistence floor to `destination`.
pub fn withdraw(ctx: &mut InvokeContext<'_, '_>) -> Result<()> {
    ctx.require_accounts(3)?;
    let bank_key = ctx.key(0)?;
    let authority = ctx.key(1)?;
    let destination = ctx.key(2)?;

    let bank = load_bank(ctx, &bank_key)?;
    if bank.authority != authority {
        return Err(Error::AuthorityMismatch {
            expected: bank.authority,
            actual: authority,
        });
    }
    ctx.require_signer(&authority)?;

    check_destination(ctx, &bank_key, &destination)?;

    let floor = ctx.rent().minimum_balance(Bank::LEN);
    let amount = ctx.lamports(&bank_key).saturating_sub(floor);
    if amount == 0 {
        return Err(Error::BankEmpty(bank_key));
    }

    ctx.move_lamports(&bank_key, &destination, amount)?;

    ctx.emit(LedgerEvent::Withdraw(WithdrawEvent {
        bank: bank_key,
        destination,
        amount,
    }));

    info!(bank = %bank_key, %destination, amount, "donation bank withdrawn");
    Ok(())
}

fn check_system_program(key: Pubkey) -> Result<()> {
    if key != SYSTEM_PROGRAM_ID {
        return Err(Error::InvalidProgramId(key));
    }
    Ok(())
}

fn load_bank(ctx: &InvokeContext<'_, '_>, key: &Pubkey) -> Result<Bank> {
    let account = ctx.account(key).ok_or(Error::AccountNotFound(*key))?;
    if account.owner != *ctx.program_id() {
        return Err(Error::IllegalOwner(*key));
    }
    Bank::try_deserialize(key, &account.data)
}

fn existing_registry(ctx: &InvokeContext<'_, '_>, key: &Pubkey) -> Result<Option<Registry>> {
    match ctx.account(key) {
        Some(account) if account.owner == *ctx.program_id() => {
            Registry::try_deserialize(key, &account.data).map(Some)
        }
        _ => Ok(None),
    }
}

/// The destination must already exist and sit at or above its own floor.
fn check_destination(ctx: &InvokeContext<'_, '_>, bank: &Pubkey, destination: &Pubkey) -> Result<()> {
    if destination == bank {
        return Err(Error::InvalidDestination(*destination));
    }
    let account = ctx
        .account(destination)
        .ok_or(Error::InvalidDestination(*destination))?;
    if account.lamports == 0 || !ctx.rent().is_exempt(account.lamports, account.data.len()) {
        return Err(Error::InvalidDestination(*destination));
    }
    Ok(())
}
