use pretty_assertions::assert_eq;
use solsplit_parser::ast::{ContractKind, FunctionKind, Stmt};
use solsplit_parser::parse_file;

const VAULT: &str = r#"pragma solidity ^0.8.0;

contract Vault {
    address private owner;
    uint256 public total;
    mapping(address => uint256) private balances;

    event Deposited(address indexed who, uint256 amount);

    modifier onlyOwner() {
        require(msg.sender == owner, "not owner");
        _;
    }

    constructor() {
        owner = msg.sender;
    }

    function deposit() public payable {
        balances[msg.sender] += msg.value;
        total += msg.value;
        emit Deposited(msg.sender, msg.value);
    }

    function withdraw(uint256 amount) public {
        require(balances[msg.sender] >= amount, "insufficient");
        balances[msg.sender] -= amount;
        total -= amount;
        (bool success, ) = msg.sender.call{value: amount}("");
        require(success, "transfer failed");
    }

    function balanceOf(address who) public view returns (uint256) {
        return balances[who];
    }
}
"#;

#[test]
fn vault_structure() {
    let unit = parse_file(VAULT).expect("vault should parse");
    let contract = unit.contract().expect("exactly one contract");
    assert_eq!(contract.name, "Vault");
    assert_eq!(contract.kind, ContractKind::Contract);
    assert_eq!(
        contract
            .variables()
            .map(|var| var.name.as_str())
            .collect::<Vec<_>>(),
        vec!["owner", "total", "balances"],
    );
    assert_eq!(
        contract
            .functions()
            .filter(|func| func.kind == FunctionKind::Function)
            .count(),
        3,
    );
}

#[test]
fn vault_round_trips() {
    let unit = parse_file(VAULT).expect("vault should parse");
    let rendered = unit.to_string();
    let reparsed = parse_file(&rendered).expect("rendered source should parse");
    assert_eq!(unit, reparsed);
}

#[test]
fn pre_0_6_constructor_shapes() {
    let src = r#"pragma solidity ^0.5.0;

contract Legacy {
    uint256 private stored;

    function Legacy(uint256 initial) public {
        stored = initial;
    }

    function () external payable {
    }
}
"#;
    let unit = parse_file(src).expect("legacy source should parse");
    let contract = unit.contract().unwrap();
    let kinds = contract
        .functions()
        .map(|func| func.kind)
        .collect::<Vec<_>>();
    // an old-style constructor is a plain function sharing the contract name
    assert_eq!(
        kinds,
        vec![FunctionKind::Function, FunctionKind::OldStyleFallback],
    );
}

#[test]
fn inline_assembly_is_kept_verbatim() {
    let src = r#"pragma solidity ^0.8.0;

contract Proxy {
    address private target;

    function forward() public payable {
        address impl = target;
        assembly {
            calldatacopy(0, 0, calldatasize())
            let result := delegatecall(gas(), impl, 0, calldatasize(), 0, 0)
            returndatacopy(0, 0, returndatasize())
            switch result
            case 0 { revert(0, returndatasize()) }
            default { return(0, returndatasize()) }
        }
    }
}
"#;
    let unit = parse_file(src).expect("proxy should parse");
    let contract = unit.contract().unwrap();
    let body = contract.functions().next().unwrap().body.as_ref().unwrap();
    match &body[1] {
        Stmt::InlineAssembly(text) => {
            assert!(text.contains("delegatecall(gas(), impl"));
            assert!(text.contains("switch result"));
        }
        other => panic!("expected inline assembly, got {other:?}"),
    }
}

#[test]
fn missing_pragma_is_allowed() {
    let unit = parse_file("contract Empty {\n}\n").expect("pragma is optional");
    assert!(unit.pragma.is_none());
}

#[test]
fn unsupported_version_is_rejected() {
    let err = parse_file("pragma solidity nonsense;\ncontract C {\n}\n").unwrap_err();
    assert!(matches!(
        err,
        solsplit_parser::ParseError::UnsupportedVersion(_)
    ));
}

#[test]
fn syntax_errors_carry_line_numbers() {
    let err = parse_file("pragma solidity ^0.8.0;\ncontract C {\n    uint256;\n}\n").unwrap_err();
    match err {
        solsplit_parser::ParseError::Syntax { line, .. } => assert_eq!(line, 3),
        other => panic!("expected syntax error, got {other}"),
    }
}
