mod common;

use common::{start_server, DummyServerImpl};
use corvus_primitives::{
    EntryPointVersion, UserOperationOverrides, UserOperationRequest, ValueOverride,
};
use corvus_rpc::{
    BundlerClient, Erc20Context, GasAndPaymasterRequest, JsonRpcBundlerClient,
    JsonRpcPaymasterClient, PaymasterClient, RpcError,
};
use ethers::types::{Address, U256};
use serde_json::json;

#[tokio::test]
async fn bundler_client_roundtrip() -> eyre::Result<()> {
    let dummy = DummyServerImpl::new(0x7a69);
    let recorded = dummy.recorded.clone();
    let (addr, handle) = start_server(dummy).await?;

    let client = JsonRpcBundlerClient::new(format!("http://{addr}"))?;
    assert_eq!(client.chain_id().await?, 0x7a69);
    assert_eq!(client.supported_entry_points().await?, vec![EntryPointVersion::V06.address()]);
    assert_eq!(client.base_fee().await?, U256::from(10_000_000_000_u64));
    assert_eq!(client.max_priority_fee_per_gas().await?, U256::from(1_000_000_000_u64));

    let entry_point = EntryPointVersion::V06.address();
    let uo = UserOperationRequest::random().normalize(EntryPointVersion::V06);
    let estimation = client.estimate_user_operation_gas(&uo, entry_point).await?;
    assert_eq!(estimation.call_gas_limit, 33_100.into());

    let signed = uo.clone().signature("0x1234".parse()?);
    let hash = client.send_user_operation(&signed, entry_point).await?;
    assert_eq!(hash, signed.hash(&entry_point, 0x7a69, EntryPointVersion::V06));
    assert_eq!(recorded.lock().sent[0].0.signature, signed.signature);

    assert!(client.get_user_operation_receipt(hash).await?.is_none());

    handle.stop()?;
    Ok(())
}

#[tokio::test]
async fn bundler_errors_are_typed() -> eyre::Result<()> {
    let (addr, handle) = start_server(DummyServerImpl::new(1)).await?;
    let client = JsonRpcBundlerClient::new(format!("http://{addr}"))?;

    let uo = UserOperationRequest::random().normalize(EntryPointVersion::V06);
    let err = client
        .send_user_operation(&uo, EntryPointVersion::V06.address())
        .await
        .expect_err("unsigned user operation is rejected");
    assert_eq!(err.code(), Some(-32602));

    // not served by the dummy
    let err = client
        .get_user_operation_by_hash(Default::default())
        .await
        .expect_err("method not found");
    assert!(matches!(err, RpcError::Call { code: -32601, .. }));

    handle.stop()?;
    Ok(())
}

#[tokio::test]
async fn missing_base_fee() -> eyre::Result<()> {
    let dummy = DummyServerImpl { base_fee: None, ..DummyServerImpl::new(1) };
    let (addr, handle) = start_server(dummy).await?;
    let client = JsonRpcBundlerClient::new(format!("http://{addr}"))?;

    assert!(matches!(client.base_fee().await, Err(RpcError::MissingValue { .. })));

    handle.stop()?;
    Ok(())
}

#[tokio::test]
async fn paymaster_client_roundtrip() -> eyre::Result<()> {
    let dummy = DummyServerImpl::new(137);
    let recorded = dummy.recorded.clone();
    let (addr, handle) = start_server(dummy).await?;
    let client = JsonRpcPaymasterClient::new(format!("http://{addr}"))?;

    let uo = UserOperationRequest::random();
    let context = json!({"policyId": "policy"});
    let res = client
        .get_paymaster_stub_data(&uo, EntryPointVersion::V06.address(), 137, &context)
        .await?;
    assert_eq!(res.paymaster_and_data, Some("0x1234".parse()?));
    assert_eq!(res.is_final, Some(true));
    assert_eq!(recorded.lock().stub_params[0], ("0x89".to_string(), context));

    let request = GasAndPaymasterRequest {
        policy_id: "policy".into(),
        entry_point: EntryPointVersion::V07.address(),
        user_operation: uo.normalize(EntryPointVersion::V07),
        dummy_signature: "0xff".parse()?,
        overrides: UserOperationOverrides {
            max_fee_per_gas: Some(ValueOverride::Multiplier { multiplier: 1.5 }),
            ..Default::default()
        },
        erc20_context: Some(Erc20Context {
            token_address: Address::repeat_byte(0x22),
            ..Default::default()
        }),
    };
    let res = client.request_gas_and_paymaster_and_data(&request).await?;
    assert_eq!(res.paymaster, Some(Address::repeat_byte(0x11)));
    assert_eq!(res.call_gas_limit, Some(50_000.into()));
    assert_eq!(recorded.lock().gas_manager[0], request);

    // `pm_getPaymasterData` isn't served by the dummy
    assert!(client
        .get_paymaster_data(&request.user_operation, request.entry_point, 137, &json!({}))
        .await
        .is_err());

    handle.stop()?;
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint() -> eyre::Result<()> {
    let client = JsonRpcBundlerClient::new("http://127.0.0.1:1")?;
    assert!(matches!(client.chain_id().await, Err(RpcError::Transport { .. })));
    Ok(())
}
